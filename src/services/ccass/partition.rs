//! 任务分组

use crate::error::{CrawlError, CrawlResult};

/// 将任务列表按原顺序切成 `n_groups` 个连续分组
///
/// 前 n-1 组长度均为 `len / n_groups`（向下取整），最后一组承接余下全部元素。
/// 分组数大于任务数时前面的分组为空；空列表得到 n 个空分组。
pub fn divide<T: Clone>(items: &[T], n_groups: usize) -> CrawlResult<Vec<Vec<T>>> {
    if n_groups == 0 {
        return Err(CrawlError::Configuration("分组数必须大于 0".to_string()));
    }

    let group_len = items.len() / n_groups;
    let mut groups: Vec<Vec<T>> = (0..n_groups - 1)
        .map(|i| items[group_len * i..group_len * (i + 1)].to_vec())
        .collect();
    groups.push(items[group_len * (n_groups - 1)..].to_vec());

    Ok(groups)
}
