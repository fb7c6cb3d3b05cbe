//! Fragment planning for oversized base64 payloads.
//!
//! Base64 payloads are ASCII, so byte offsets and char offsets coincide and
//! slicing is plain numeric chunking.

use super::{BlobError, BlobResult};

/// How a base64 payload is laid out across the head fragment and tail chunks.
///
/// The head carries the data-URL prefix plus the first `head_len` payload
/// chars; each tail chunk is prefix-free. Slices are consecutive and
/// non-overlapping, so `head_len + sum(tail_lens)` always equals the payload
/// length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentPlan {
    /// Payload chars carried on the parent record, after the prefix.
    pub head_len: usize,
    /// Length of each tail chunk, in payload order.
    pub tail_lens: Vec<usize>,
}

impl FragmentPlan {
    pub fn is_chunked(&self) -> bool {
        !self.tail_lens.is_empty()
    }

    pub fn chunk_count(&self) -> usize {
        self.tail_lens.len()
    }

    pub fn total_len(&self) -> usize {
        self.head_len + self.tail_lens.iter().sum::<usize>()
    }
}

/// Plan how a payload of `payload_len` chars is split for storage.
///
/// A payload that fits on the parent record together with its prefix yields
/// an unchunked plan. Otherwise the head takes `chunk_limit - prefix_len`
/// chars and the rest is cut into tail chunks of at most `chunk_limit` chars.
/// Fails before any write when the prefix alone exhausts the chunk limit.
pub fn plan_fragments(
    payload_len: usize,
    prefix_len: usize,
    chunk_limit: usize,
) -> BlobResult<FragmentPlan> {
    if prefix_len + payload_len <= chunk_limit {
        return Ok(FragmentPlan {
            head_len: payload_len,
            tail_lens: Vec::new(),
        });
    }

    if prefix_len >= chunk_limit {
        return Err(BlobError::EncodingOverflow {
            chunk_limit,
            prefix_len,
        });
    }

    let head_len = chunk_limit - prefix_len;
    let mut tail_lens = Vec::new();
    let mut remaining = payload_len - head_len;
    while remaining > 0 {
        let take = remaining.min(chunk_limit);
        tail_lens.push(take);
        remaining -= take;
    }

    Ok(FragmentPlan { head_len, tail_lens })
}

/// Slice a payload according to a plan, returning the head slice and the tail
/// slices in payload order.
pub fn split_payload<'a>(payload: &'a str, plan: &FragmentPlan) -> (&'a str, Vec<&'a str>) {
    let head = &payload[..plan.head_len];
    let mut tails = Vec::with_capacity(plan.tail_lens.len());
    let mut offset = plan.head_len;
    for &len in &plan.tail_lens {
        tails.push(&payload[offset..offset + len]);
        offset += len;
    }
    (head, tails)
}
