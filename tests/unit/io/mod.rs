mod error;
mod progress;
mod store;
