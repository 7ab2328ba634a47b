pub mod postgres;

pub use postgres::MetricsStore;
