//! Identifier casing transforms.
//!
//! C++ headers mix `snake_case`, `SCREAMING_CASE`, `camelCase` and
//! `PascalCase`. Binding surfaces want a single idiomatic form, so every
//! rename goes through [`split_identifier`] and [`join_idiomatic`].

/// Word separator recognized by [`split_identifier`].
pub const WORD_SEPARATOR: char = '_';

/// Split an identifier into words.
///
/// If the separator occurs anywhere in `name`, tokens are produced purely by
/// splitting on it (lowercased, empty pieces dropped). Otherwise the name is
/// split at every lowercase→uppercase transition and tokens keep their case.
///
/// ```
/// use bindery_common::split_identifier;
/// assert_eq!(split_identifier("max_HP"), vec!["max", "hp"]);
/// assert_eq!(split_identifier("getMaxHP"), vec!["get", "Max", "HP"]);
/// ```
pub fn split_identifier(name: &str) -> Vec<String> {
    if name.contains(WORD_SEPARATOR) {
        return name
            .split(WORD_SEPARATOR)
            .filter(|part| !part.is_empty())
            .map(str::to_lowercase)
            .collect();
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase();
        current.push(ch);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Join tokens with each token's first character upper-cased.
pub fn join_idiomatic<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut result = String::new();
    for token in tokens {
        let mut chars = token.as_ref().chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}

/// Convert an identifier to the idiomatic (PascalCase) form.
pub fn to_idiomatic_case(name: &str) -> String {
    join_idiomatic(&split_identifier(name))
}

/// Strip a redundant leading token that abbreviates the owning type's name.
///
/// The first token of `tokens` is stripped when it equals the owner's full
/// word sequence (`BlendMode_Replace` in `BlendMode`), or when its letters
/// match, position by position, the first letters of the owner's words
/// (`TU_DIFFUSE` in `TextureUnit`). Matching stops at the first mismatch; an
/// owner with fewer words than the token has letters is not an error, the
/// token is simply kept. Single-letter tokens and tokens that would leave
/// nothing behind are never stripped.
pub fn strip_owner_prefix(tokens: &[String], owner: &str) -> Option<Vec<String>> {
    if tokens.len() < 2 {
        return None;
    }

    let owner_words = split_identifier(owner);
    if owner_words.is_empty() {
        return None;
    }

    let joined_owner: String = owner_words.iter().map(|w| w.to_lowercase()).collect();
    let first = tokens[0].to_lowercase();
    if first == joined_owner {
        return Some(tokens[1..].to_vec());
    }

    if first.chars().count() < 2 {
        return None;
    }

    let mut words = owner_words.iter();
    for letter in first.chars() {
        let Some(word) = words.next() else {
            return None;
        };
        let initial = word.chars().next().map(|c| c.to_ascii_lowercase());
        if initial != Some(letter) {
            return None;
        }
    }
    Some(tokens[1..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_wins_over_case() {
        assert_eq!(split_identifier("max_HP"), vec!["max", "hp"]);
        assert_eq!(split_identifier("MAX_PLAYERS"), vec!["max", "players"]);
        assert_eq!(split_identifier("position_"), vec!["position"]);
        assert_eq!(split_identifier("_leading"), vec!["leading"]);
    }

    #[test]
    fn test_case_transitions() {
        assert_eq!(split_identifier("GetSpeed"), vec!["Get", "Speed"]);
        assert_eq!(split_identifier("getSpeed"), vec!["get", "Speed"]);
        assert_eq!(split_identifier("HTTPServer"), vec!["HTTPServer"]);
        assert_eq!(split_identifier("kMaxPlayers"), vec!["k", "Max", "Players"]);
        assert_eq!(split_identifier("Vector3D"), vec!["Vector3D"]);
    }

    #[test]
    fn test_idiomatic_case() {
        assert_eq!(to_idiomatic_case("MAX_PLAYERS"), "MaxPlayers");
        assert_eq!(to_idiomatic_case("getSpeed"), "GetSpeed");
        assert_eq!(to_idiomatic_case("GetSpeed"), "GetSpeed");
        assert_eq!(to_idiomatic_case("world_position_"), "WorldPosition");
        assert_eq!(to_idiomatic_case(""), "");
    }

    #[test]
    fn test_idiomatic_case_is_idempotent() {
        for name in ["max_HP", "getSpeed", "MAX_PLAYERS", "IsEnabled", "a_b_c", "XMLFile", "x"] {
            let once = to_idiomatic_case(name);
            assert_eq!(to_idiomatic_case(&once), once, "not idempotent for {name}");
        }
    }

    #[test]
    fn test_strip_initials_prefix() {
        let tokens = split_identifier("TU_DIFFUSE");
        assert_eq!(
            strip_owner_prefix(&tokens, "TextureUnit"),
            Some(vec!["diffuse".to_string()])
        );
    }

    #[test]
    fn test_strip_full_owner_prefix() {
        let tokens = split_identifier("BlendMode_Replace");
        assert_eq!(
            strip_owner_prefix(&tokens, "BlendMode"),
            Some(vec!["replace".to_string()])
        );
    }

    #[test]
    fn test_strip_skipped_on_mismatch_or_short_owner() {
        let tokens = split_identifier("DD_SOURCE");
        assert_eq!(strip_owner_prefix(&tokens, "DragAndDropMode"), None);

        // Owner has a single word, token needs three initials.
        let tokens = split_identifier("ABC_VALUE");
        assert_eq!(strip_owner_prefix(&tokens, "Apple"), None);

        // Nothing would remain.
        let tokens = split_identifier("TU");
        assert_eq!(strip_owner_prefix(&tokens, "TextureUnit"), None);
    }
}
