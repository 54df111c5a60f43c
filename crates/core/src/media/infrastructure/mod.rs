pub mod http_image_source;
pub mod image_codec;
