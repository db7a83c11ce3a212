/// Replace zero samples by linear interpolation between the surrounding
/// non-zero anchors. Zeroes before the first anchor take its value, zeroes
/// after the last anchor take that one's; edges are never extrapolated
/// linearly. With fewer than two anchors the input is returned unchanged.
pub fn interpolate_zeroes(signal: &[f64]) -> Vec<f64> {
    let anchors: Vec<(usize, f64)> = signal
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, v)| v != 0.0)
        .collect();

    let (Some(&(first_idx, first_val)), Some(&(last_idx, last_val))) = (anchors.first(), anchors.last()) else {
        return signal.to_vec();
    };
    if anchors.len() < 2 {
        return signal.to_vec();
    }

    let mut out = signal.to_vec();
    let mut segment = 0;
    for (i, value) in out.iter_mut().enumerate() {
        if *value != 0.0 {
            continue;
        }
        if i < first_idx {
            *value = first_val;
        } else if i > last_idx {
            *value = last_val;
        } else {
            while anchors[segment + 1].0 < i {
                segment += 1;
            }
            let (x0, y0) = anchors[segment];
            let (x1, y1) = anchors[segment + 1];
            *value = y0 + (y1 - y0) * (i - x0) as f64 / (x1 - x0) as f64;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_interior_gaps_linearly() {
        let out = interpolate_zeroes(&[2.0, 0.0, 0.0, 8.0]);
        assert_eq!(out, vec![2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn edges_are_flat() {
        let out = interpolate_zeroes(&[0.0, 0.0, 3.0, 0.0, 5.0, 0.0]);
        assert_eq!(out, vec![3.0, 3.0, 3.0, 4.0, 5.0, 5.0]);
    }

    #[test]
    fn single_anchor_is_returned_unchanged() {
        let input = [0.0, 7.0, 0.0];
        assert_eq!(interpolate_zeroes(&input), input.to_vec());
        assert_eq!(interpolate_zeroes(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert!(interpolate_zeroes(&[]).is_empty());
    }
}
