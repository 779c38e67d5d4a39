// TIFF LZW (compression tag 5) uses MSB bit order and starts at a minimum code width of 8 bits,
// switching to wider codes at the table-size boundaries - `with_tiff_size_switch` on the `weezl`
// decoder implements exactly that variant.
// https://github.com/image-rs/image-tiff/blob/90ae5b8e54356a35e266fb24e969aafbcb26e990/src/decoder/stream.rs#L147

use crate::Error;

pub fn decompress(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut decoder = weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8);
    decoder
        .decode(data)
        .map_err(|e| Error::DecompressionError(format!("LZW decode error: {}", e)))
}
