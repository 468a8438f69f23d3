mod store;
mod support;
mod sync;
