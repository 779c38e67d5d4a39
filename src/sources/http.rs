use std::cmp::min;

use crate::auth::aws::sign_request;
#[cfg(feature = "gcs")]
use crate::auth::gcs::GCSAuth;
use crate::errors::Error;
use bytes::Buf;
use percent_encoding::{utf8_percent_encode, AsciiSet};
use reqwest::Client;

const GCS_ENDPOINT: &str = "https://storage.googleapis.com/storage/v1";

// TODO: Should include all the ones described here:
// https://cloud.google.com/storage/docs/request-endpoints#encoding
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &percent_encoding::CONTROLS.add(b'/').add(b'%');

// https://cloud.google.com/storage/docs/json_api/v1/objects/get?hl=en
fn make_url_for_object(bucket_name: &str, blob_name: &str) -> String {
    let encoded_blob_name: String =
        utf8_percent_encode(blob_name, PATH_SEGMENT_ENCODE_SET).to_string();
    format!(
        "{}/b/{}/o/{}?alt=media",
        GCS_ENDPOINT, bucket_name, encoded_blob_name
    )
}

#[derive(Debug, Default)]
struct Stats {
    requests_count: usize,
}

enum Auth {
    None,
    AwsSigV4 { host: String, uri: String },
    #[cfg(feature = "gcs")]
    Gcs(GCSAuth),
}

/// A single HTTP(S) range-read backend, parameterized by an `Auth` strategy.
/// This folds together what a "plain" bucket-style GET (S3/MinIO, signed
/// with SigV4) and the GCS JSON API (bearer-token OAuth2) both need: build a
/// URL once at construction time, then issue `Range:` GETs against it.
pub struct HttpSource {
    client: Client,
    url: String,
    auth: Auth,
    stats: Stats,
}

impl HttpSource {
    pub async fn new_anonymous(url: &str) -> Result<HttpSource, Error> {
        Ok(HttpSource {
            client: Client::builder().build()?,
            url: url.to_string(),
            auth: Auth::None,
            stats: Default::default(),
        })
    }

    pub async fn new_s3(host: &str, uri: &str) -> Result<HttpSource, Error> {
        let uri = if uri.starts_with('/') {
            uri.to_string()
        } else {
            format!("/{}", uri)
        };
        Ok(HttpSource {
            client: Client::builder().build()?,
            url: format!("http://{}{}", host, uri),
            auth: Auth::AwsSigV4 {
                host: host.to_string(),
                uri,
            },
            stats: Default::default(),
        })
    }

    #[cfg(feature = "gcs")]
    pub async fn new_gcs(bucket_name: &str, blob_name: &str) -> Result<HttpSource, Error> {
        Ok(HttpSource {
            client: Client::builder().build()?,
            url: make_url_for_object(bucket_name, blob_name),
            auth: Auth::Gcs(GCSAuth::new()?),
            stats: Default::default(),
        })
    }

    pub async fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        let mut request = self
            .client
            .get(&self.url)
            .header("Range", format!("bytes={}-{}", offset, offset + buf.len() as u64));
        request = match &mut self.auth {
            Auth::None => request,
            Auth::AwsSigV4 { host, uri } => {
                let headers = sign_request("GET", host, uri)?;
                request
                    .header("Host", headers.host_header)
                    .header("x-amz-date", headers.amz_date_header)
                    .header("Authorization", headers.authorization_header)
            }
            #[cfg(feature = "gcs")]
            Auth::Gcs(auth) => {
                let access_token = auth.get_access_token(&self.client).await?;
                request.header("Authorization", format!("Bearer {}", access_token.token))
            }
        };
        self.stats.requests_count += 1;
        let resp = request.send().await?;
        // We check for explicit 206 (Partial Content) because if the server would not support
        // range requests, it could just reply with 200 and the whole document, but we don't
        // support/want this here
        let mut body = if resp.status().as_u16() == 206 {
            // Note that EOF is implicitely handled here because if we do a partial past EOF read,
            // we'll still get a 206 but the server will just return the data until EOF, so our
            // logic below transparently handles this
            resp.bytes().await?
        } else {
            return Err(Error::OtherError(format!(
                "Request failed, code={}: {}",
                resp.status().as_u16(),
                resp.text().await?,
            )));
        };

        let body_len = body.remaining();
        let len_to_copy = min(body_len, buf.len());
        body.copy_to_slice(&mut buf[0..len_to_copy]);
        Ok(len_to_copy)
    }

    pub fn get_stats(&self) -> String {
        format!("{:?}", self.stats)
    }
}
