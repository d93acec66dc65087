pub mod browser;
pub mod delay;
pub mod extract;
pub mod http;
pub mod sample;
pub mod traits;

pub use browser::BrowserStrategy;
pub use http::HttpStrategy;
pub use sample::SampleStrategy;
pub use traits::FetchStrategy;
