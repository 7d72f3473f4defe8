mod record;
mod source;

pub use record::RecordLike;
pub use source::DataSource;
