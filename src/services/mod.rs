pub mod news;
pub mod providers;

pub use news::NewsClient;
