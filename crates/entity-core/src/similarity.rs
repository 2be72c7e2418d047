//! String similarity for company names.
//!
//! [`ratio`] is the Ratcliff/Obershelp "gestalt" score: twice the number of
//! characters in matching blocks divided by the total length of both strings.

/// Corporate suffix tokens ignored when comparing names.
const CORPORATE_SUFFIXES: &[&str] = &[
    "inc",
    "corp",
    "corporation",
    "ltd",
    "limited",
    "llc",
    "lp",
    "llp",
    "co",
    "company",
];

/// Returns the similarity of two strings in `[0, 1]`.
///
/// Comparison is character-based and case-sensitive; callers lowercase first
/// when case should not matter. Two empty strings are identical.
#[must_use]
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Counts characters in the recursively found longest matching blocks.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, k) = longest_match(a, b);
    if k == 0 {
        return 0;
    }
    k + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + k..], &b[j + k..])
}

/// Finds the longest common block, preferring the earliest in `a`, then in `b`.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // lengths[j + 1] = length of the common suffix of a[..=i] and b[..=j]
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            let k = curr[j + 1];
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    best
}

/// Normalizes a company name for comparison.
///
/// Lowercases, turns punctuation into spaces, drops corporate suffix tokens
/// such as "inc" or "llc", and collapses whitespace.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !CORPORATE_SUFFIXES.contains(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns the similarity of two company names in `[0, 1]`.
///
/// Names equal after [`normalize_name`] score exactly 1.0. When either side
/// normalizes to nothing the raw lowercase names are compared instead.
#[must_use]
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let na = normalize_name(a);
    let nb = normalize_name(b);

    if na.is_empty() || nb.is_empty() {
        return ratio(&a.trim().to_lowercase(), &b.trim().to_lowercase());
    }
    if na == nb {
        return 1.0;
    }
    ratio(&na, &nb)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_ratio_known_values() {
        assert!(approx(ratio("abcd", "bcde"), 0.75));
        assert!(approx(ratio("apple", "apple"), 1.0));
        assert!(approx(ratio("abc", "xyz"), 0.0));
        assert!(approx(ratio("", ""), 1.0));
        assert!(approx(ratio("abc", ""), 0.0));
        // 2 * 9 / 19
        assert!(approx(ratio("apple inc", "apple inc."), 18.0 / 19.0));
    }

    #[test]
    fn test_ratio_is_symmetric_for_distinct_blocks() {
        let a = "microsoft corporation";
        let b = "micro soft corp";
        assert!(approx(ratio(a, b), ratio(b, a)));
    }

    #[test]
    fn test_normalize_name_strips_suffixes() {
        assert_eq!(normalize_name("Apple Inc."), "apple");
        assert_eq!(normalize_name("ABC Corp, LLC"), "abc");
        assert_eq!(normalize_name("  Berkshire  Hathaway   Inc "), "berkshire hathaway");
        assert_eq!(normalize_name("Coca-Cola Co"), "coca cola");
    }

    #[test]
    fn test_name_similarity() {
        assert!(approx(name_similarity("ABC Corporation", "ABC Corp"), 1.0));
        assert!(approx(name_similarity("Apple Inc.", "APPLE INC"), 1.0));
        assert!(name_similarity("Microsoft", "Micro Soft") > 0.8);
        assert!(name_similarity("Apple", "Exxon Mobil") < 0.5);
        // suffix-only names still compare
        assert!(approx(name_similarity("Inc", "inc"), 1.0));
    }
}
