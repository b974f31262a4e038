mod follow;
mod migrate;
mod resolve_handle;

pub use follow::{
    follow_record, FollowExecutor, CREATE_RECORD, FOLLOW_COLLECTION, TIMESTAMP_FORMAT,
};
pub use migrate::MigrateUseCase;
pub use resolve_handle::{HandleResolver, RESOLVE_HANDLE};
