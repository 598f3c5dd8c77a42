use crate::types::{Alignment, AlignmentChunk, EditOp};

const TAG_EQUAL: u8 = 0;
const TAG_SUBSTITUTE: u8 = 1;
const TAG_DELETE: u8 = 2;
const TAG_INSERT: u8 = 3;

/// Above this many matrix cells a single alignment allocates hundreds of MiB.
const LARGE_MATRIX_CELLS: usize = 100_000_000;

/// Unit-cost edit distance alignment with an explicit operation trace.
///
/// Costs are computed row by row, but the backpointer tag of every cell of the
/// `(len(ref)+1) x (len(hyp)+1)` matrix is kept so the trace can be recovered.
/// Among equal-cost predecessors the tag order is
/// equal > substitute > delete > insert; this order is part of the output
/// contract since alternative orders yield different (equally short) traces.
pub fn align_sequences<T: PartialEq>(reference: &[T], hypothesis: &[T]) -> Alignment {
    let r_len = reference.len();
    let h_len = hypothesis.len();

    if r_len == 0 && h_len == 0 {
        return Alignment::default();
    }
    if r_len == 0 {
        return Alignment::from_chunks(vec![chunk(TAG_INSERT, 0, 0, 0, h_len)]);
    }
    if h_len == 0 {
        return Alignment::from_chunks(vec![chunk(TAG_DELETE, 0, r_len, 0, 0)]);
    }

    let width = h_len + 1;
    let cells = (r_len + 1) * width;
    if cells >= LARGE_MATRIX_CELLS {
        tracing::warn!(
            reference_len = r_len,
            hypothesis_len = h_len,
            cells,
            "aligning very long sequences; memory use is quadratic"
        );
    }

    let mut prev: Vec<usize> = (0..=h_len).collect();
    let mut curr = vec![0usize; width];
    // Row 0 is all insertions; column 0 is overwritten with deletions below.
    let mut bp = vec![TAG_INSERT; cells];

    for i in 1..=r_len {
        let row = i * width;
        bp[row] = TAG_DELETE;
        curr[0] = i;
        let r_tok = &reference[i - 1];
        for j in 1..=h_len {
            let (cost, tag) = if *r_tok == hypothesis[j - 1] {
                (prev[j - 1], TAG_EQUAL)
            } else {
                best_edit(prev[j - 1], prev[j], curr[j - 1])
            };
            curr[j] = cost;
            bp[row + j] = tag;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let chunks = backtrace(&bp, width, r_len, h_len);
    let alignment = Alignment::from_chunks(chunks);
    debug_assert_eq!(alignment.edit_distance(), prev[h_len]);
    alignment
}

/// Edit distance only, in `O(len(hyp))` memory.
pub fn edit_distance<T: PartialEq>(reference: &[T], hypothesis: &[T]) -> usize {
    let h_len = hypothesis.len();
    let mut prev: Vec<usize> = (0..=h_len).collect();
    let mut curr = vec![0usize; h_len + 1];

    for (i, r_tok) in reference.iter().enumerate() {
        curr[0] = i + 1;
        for j in 1..=h_len {
            curr[j] = if *r_tok == hypothesis[j - 1] {
                prev[j - 1]
            } else {
                best_edit(prev[j - 1], prev[j], curr[j - 1]).0
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[h_len]
}

#[inline(always)]
fn best_edit(diag: usize, up: usize, left: usize) -> (usize, u8) {
    let mut best = diag;
    let mut tag = TAG_SUBSTITUTE;
    if up < best {
        best = up;
        tag = TAG_DELETE;
    }
    if left < best {
        best = left;
        tag = TAG_INSERT;
    }
    (best + 1, tag)
}

fn backtrace(bp: &[u8], width: usize, r_len: usize, h_len: usize) -> Vec<AlignmentChunk> {
    let mut chunks = Vec::new();
    let (mut i, mut j) = (r_len, h_len);
    // (tag, ref_end, hyp_end) of the run being accumulated.
    let mut run: Option<(u8, usize, usize)> = None;

    while i > 0 || j > 0 {
        let tag = bp[i * width + j];
        match run {
            Some((run_tag, _, _)) if run_tag == tag => {}
            Some((run_tag, ref_end, hyp_end)) => {
                chunks.push(chunk(run_tag, i, ref_end, j, hyp_end));
                run = Some((tag, i, j));
            }
            None => run = Some((tag, i, j)),
        }
        match tag {
            TAG_EQUAL | TAG_SUBSTITUTE => {
                i -= 1;
                j -= 1;
            }
            TAG_DELETE => i -= 1,
            _ => j -= 1,
        }
    }
    if let Some((run_tag, ref_end, hyp_end)) = run {
        chunks.push(chunk(run_tag, 0, ref_end, 0, hyp_end));
    }

    chunks.reverse();
    chunks
}

fn chunk(tag: u8, ref_start: usize, ref_end: usize, hyp_start: usize, hyp_end: usize) -> AlignmentChunk {
    let op = match tag {
        TAG_EQUAL => EditOp::Equal,
        TAG_SUBSTITUTE => EditOp::Substitute,
        TAG_DELETE => EditOp::Delete,
        _ => EditOp::Insert,
    };
    AlignmentChunk {
        op,
        ref_start,
        ref_end,
        hyp_start,
        hyp_end,
    }
}
