/// Myers O(ND) longest-common-subsequence with a per-diagonal history
/// optimization (Chris Marchetti's variant): each diagonal `k` keeps only the
/// furthest-reaching `x` and the list of matched index pairs along that path,
/// so the final snake's history *is* the answer — no separate backtracking
/// pass over a recorded trace table. Accepts a custom equality predicate so
/// callers can match on node similarity, placeholder identity, etc. instead
/// of plain equality. Common prefix/suffix are trimmed before the search.
pub fn longest_common_subsequence<T, F>(a: &[T], b: &[T], eq: F) -> Vec<(usize, usize)>
where
    F: Fn(&T, &T) -> bool,
{
    let n = a.len();
    let m = b.len();

    let mut start = 0;
    while start < n && start < m && eq(&a[start], &b[start]) {
        start += 1;
    }

    let mut end_a = n;
    let mut end_b = m;
    while end_a > start && end_b > start && eq(&a[end_a - 1], &b[end_b - 1]) {
        end_a -= 1;
        end_b -= 1;
    }

    let mut pairs: Vec<(usize, usize)> = (0..start).map(|i| (i, i)).collect();

    let middle = myers_middle(&a[start..end_a], &b[start..end_b], &eq);
    pairs.extend(middle.into_iter().map(|(i, j)| (i + start, j + start)));

    let suffix_len = n - end_a;
    pairs.extend((0..suffix_len).map(|k| (end_a + k, end_b + k)));

    pairs
}

fn myers_middle<T, F>(a: &[T], b: &[T], eq: &F) -> Vec<(usize, usize)>
where
    F: Fn(&T, &T) -> bool,
{
    let n = a.len() as isize;
    let m = b.len() as isize;
    if n == 0 || m == 0 {
        return Vec::new();
    }

    let max_d = n + m;
    let offset = max_d as usize;
    let size = 2 * max_d as usize + 1;
    let mut v: Vec<isize> = vec![0; size];
    let mut history: Vec<Vec<(usize, usize)>> = vec![Vec::new(); size];

    for d in 0..=max_d {
        let mut k = -d;
        while k <= d {
            let idx = (k + offset as isize) as usize;
            let take_down = k == -d || (k != d && v[idx - 1] < v[idx + 1]);

            let (mut x, mut hist) = if take_down {
                (v[idx + 1], history[idx + 1].clone())
            } else {
                (v[idx - 1] + 1, history[idx - 1].clone())
            };
            let mut y = x - k;

            while x < n && y < m && eq(&a[x as usize], &b[y as usize]) {
                hist.push((x as usize, y as usize));
                x += 1;
                y += 1;
            }

            v[idx] = x;
            history[idx] = hist;

            if x >= n && y >= m {
                return history[idx].clone();
            }
            k += 2;
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_common_subsequence() {
        let a: Vec<char> = "ABCABBA".chars().collect();
        let b: Vec<char> = "CBABAC".chars().collect();
        let pairs = longest_common_subsequence(&a, &b, |x, y| x == y);
        for &(i, j) in &pairs {
            assert_eq!(a[i], b[j]);
        }
        // The sequence "BABA" is a longest common subsequence of length 4.
        assert_eq!(pairs.len(), 4);
    }

    #[test]
    fn identical_sequences_match_everywhere() {
        let a: Vec<char> = "hello".chars().collect();
        let pairs = longest_common_subsequence(&a, &a, |x, y| x == y);
        assert_eq!(pairs, vec![(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)]);
    }

    #[test]
    fn disjoint_sequences_have_no_matches() {
        let a: Vec<char> = "abc".chars().collect();
        let b: Vec<char> = "xyz".chars().collect();
        assert!(longest_common_subsequence(&a, &b, |x, y| x == y).is_empty());
    }
}
