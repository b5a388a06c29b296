//! Frame index sampling and windowing.
//!
//! Sampling maps the original frame rate down to the analysis rate by taking
//! every `step`-th frame. Windows are fixed-length, fixed-stride slices of the
//! sampled indices; a trailing slice shorter than `num_frames` is dropped.

/// Frame indices to decode for a video, strictly increasing.
///
/// When `sample_fps >= orig_fps` every frame is used, otherwise every
/// `max(1, round(orig_fps / sample_fps))`-th frame starting at 0.
pub fn sample_indices(orig_fps: f64, frame_count: usize, sample_fps: f64) -> Vec<usize> {
    if sample_fps >= orig_fps || sample_fps <= 0.0 {
        return (0..frame_count).collect();
    }
    let step = ((orig_fps / sample_fps).round() as usize).max(1);
    (0..frame_count).step_by(step).collect()
}

/// Group sampled indices into overlapping windows of exactly `num_frames`.
///
/// Windows start at offsets 0, stride, 2*stride, ... Zero `num_frames` or
/// `stride` yields no windows.
pub fn make_windows(indices: &[usize], num_frames: usize, stride: usize) -> Vec<&[usize]> {
    if num_frames == 0 || stride == 0 {
        return Vec::new();
    }
    indices.windows(num_frames).step_by(stride).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_all_frames_when_target_is_higher() {
        assert_eq!(sample_indices(10.0, 5, 30.0), vec![0, 1, 2, 3, 4]);
        assert_eq!(sample_indices(10.0, 5, 10.0), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_sample_exact_step() {
        assert_eq!(sample_indices(30.0, 10, 10.0), vec![0, 3, 6, 9]);
        assert_eq!(sample_indices(30.0, 600, 10.0).len(), 200);
        // 29.97 / 10 rounds to a step of 3
        assert_eq!(sample_indices(29.97, 7, 10.0), vec![0, 3, 6]);
    }

    #[test]
    fn test_sample_empty_video() {
        assert!(sample_indices(30.0, 0, 10.0).is_empty());
    }

    #[test]
    fn test_single_window_from_twenty_indices() {
        let indices: Vec<usize> = (0..20).collect();
        let windows = make_windows(&indices, 16, 8);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0], &indices[0..16]);
    }

    #[test]
    fn test_windows_overlap_by_stride() {
        let indices: Vec<usize> = (0..32).collect();
        let windows = make_windows(&indices, 16, 8);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[1][0], 8);
        assert_eq!(windows[2][15], 31);
        assert!(windows.iter().all(|w| w.len() == 16));
    }

    #[test]
    fn test_too_few_indices_yield_no_window() {
        let indices: Vec<usize> = (0..15).collect();
        assert!(make_windows(&indices, 16, 8).is_empty());
    }

    #[test]
    fn test_degenerate_parameters() {
        let indices: Vec<usize> = (0..32).collect();
        assert!(make_windows(&indices, 0, 8).is_empty());
        assert!(make_windows(&indices, 16, 0).is_empty());
    }
}
