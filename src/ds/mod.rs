pub mod frequency_buckets;
pub mod intrusive_list;
pub mod slot_arena;

pub use frequency_buckets::{
    DEFAULT_BUCKET_PREALLOC, DENSE_BUCKET_LIMIT, FrequencyBucketEntryMeta, FrequencyBuckets,
};
pub use intrusive_list::IntrusiveList;
pub use slot_arena::{SlotArena, SlotId};
