/// Expand `${VAR}` and `${VAR:-default}` placeholders from the process
/// environment.
///
/// A placeholder with no value and no default is left untouched so the
/// validator can point at it.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];
        let Some(end) = body.find('}') else {
            // Unterminated, keep the remainder verbatim.
            out.push_str(&rest[start..]);
            return out;
        };

        let expr = &body[..end];
        let (name, default) = match expr.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (expr, None),
        };

        let value = if name.is_empty() {
            None
        } else {
            match (lookup(name), default) {
                (Some(v), Some(d)) if v.is_empty() => Some(d.to_string()),
                (Some(v), _) => Some(v),
                (None, Some(d)) => Some(d.to_string()),
                (None, None) => None,
            }
        };

        match value {
            Some(v) => out.push_str(&v),
            None => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &body[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn lookup(name: &str) -> Option<String> {
        match name {
            "RO_USER" => Some("robot".into()),
            "RO_EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[rstest]
    #[case("identity_name = \"${RO_USER}\"", "identity_name = \"robot\"")]
    #[case("${RO_MISSING}", "${RO_MISSING}")]
    #[case("${RO_MISSING:-fallback}", "fallback")]
    #[case("${RO_EMPTY:-fallback}", "fallback")]
    #[case("${RO_EMPTY}", "")]
    #[case("${}", "${}")]
    #[case("a ${RO_USER", "a ${RO_USER")]
    #[case("${RO_USER}-${RO_USER}", "robot-robot")]
    #[case("plain text", "plain text")]
    fn substitution(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(substitute_env_with(input, lookup), expected);
    }
}
