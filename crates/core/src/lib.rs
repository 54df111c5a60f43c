pub mod assets;
pub mod caching;
pub mod compositing;
pub mod detection;
pub mod media;
pub mod pipeline;
pub mod request;
pub mod shared;
pub mod telemetry;

#[cfg(test)]
mod test_support;
