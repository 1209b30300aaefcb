//! Page math for alpha buckets

use std::ops::RangeInclusive;

/// How one alpha bucket splits into pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPlan {
    pub alpha: String,
    pub item_count: u64,
    pub page_size: u64,
    pub page_count: u32,
    /// Items expected on the final page; a full page when the count divides evenly
    pub last_page_count: u64,
}

/// Plans the pages of a bucket holding `item_count` items
pub fn plan_bucket(alpha: &str, item_count: u64, page_size: u32) -> BucketPlan {
    let page_size = u64::from(page_size.max(1));
    let page_count = item_count.div_ceil(page_size);
    let remainder = item_count % page_size;

    BucketPlan {
        alpha: alpha.to_string(),
        item_count,
        page_size,
        page_count: u32::try_from(page_count).unwrap_or(u32::MAX),
        last_page_count: if remainder == 0 { page_size } else { remainder },
    }
}

impl BucketPlan {
    /// Page numbers of this bucket, ascending from 1
    pub fn pages(&self) -> RangeInclusive<u32> {
        1..=self.page_count
    }

    pub fn contains(&self, page_num: u32) -> bool {
        self.pages().contains(&page_num)
    }

    /// Number of items a correct fetch of `page_num` returns
    pub fn expected_count(&self, page_num: u32) -> u64 {
        if page_num == self.page_count {
            self.last_page_count
        } else {
            self.page_size
        }
    }
}
