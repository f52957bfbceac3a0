pub mod config;
pub mod normalize;
pub mod paths;
pub mod record;
pub mod remote;
pub mod store;
pub mod sync;
pub mod version;
