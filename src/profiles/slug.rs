use rand::Rng;

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 4;

/// Lowercases the username and collapses every run of characters outside
/// `[a-z0-9]` into a single `-`, trimming dashes at both ends.
pub fn slugify(username: &str) -> String {
    let mut slug = String::with_capacity(username.len());
    let mut pending_dash = false;
    for ch in username.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Candidate share slug: the slugified username (or `user-` and the first six
/// characters of the id) plus a random four-character base36 suffix.
pub fn build_profile_slug<R: Rng + ?Sized>(username: Option<&str>, user_id: &str, rng: &mut R) -> String {
    let base = username.map(slugify).unwrap_or_default();
    let base = if base.is_empty() {
        format!("user-{}", user_id.chars().take(6).collect::<String>())
    } else {
        base
    };
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{base}-{suffix}")
}
