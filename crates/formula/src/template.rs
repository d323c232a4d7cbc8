//! Variable substitution in step commands
//!
//! Steps may reference variables as `$NAME` or `${NAME}`. Names known to the
//! lookup are replaced with their value; unknown names are left untouched so
//! the shell still sees them. `$$` produces a literal `$`.

/// Expand `$NAME`, `${NAME}` and `$$` in `input` using `lookup`
pub fn expand<'a, F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) if is_name(&braced[..end]) => {
                    let name = &braced[..end];
                    match lookup(name) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push_str("${");
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &braced[end + 1..];
                }
                // Not a plain reference (`${VAR:-x}` and friends): leave it to the shell
                _ => {
                    out.push('$');
                    rest = after;
                }
            }
        } else {
            let len = name_len(after);
            if len == 0 {
                out.push('$');
                rest = after;
            } else {
                let name = &after[..len];
                match lookup(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('$');
                        out.push_str(name);
                    }
                }
                rest = &after[len..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Length of the variable name at the start of `s`
fn name_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(s.len(), |(i, _)| i)
}

fn is_name(s: &str) -> bool {
    !s.is_empty() && name_len(s) == s.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([("PREFIX", "/opt/x"), ("JOBS", "1")])
    }

    fn run(input: &str) -> String {
        let vars = vars();
        expand(input, |name| vars.get(name).copied())
    }

    #[test]
    fn test_plain_and_braced() {
        assert_eq!(run("make install PREFIX=$PREFIX"), "make install PREFIX=/opt/x");
        assert_eq!(run("cp dist/bin/* ${PREFIX}/bin"), "cp dist/bin/* /opt/x/bin");
        assert_eq!(run("make -j$JOBS all"), "make -j1 all");
    }

    #[test]
    fn test_name_boundaries() {
        // $PREFIXES is a different variable
        assert_eq!(run("echo $PREFIXES"), "echo $PREFIXES");
        assert_eq!(run("echo $PREFIX/lib:$PREFIX"), "echo /opt/x/lib:/opt/x");
    }

    #[test]
    fn test_unknown_and_special_left_for_shell() {
        assert_eq!(run("echo $HOME ${USER}"), "echo $HOME ${USER}");
        assert_eq!(run("echo $1 $? $"), "echo $1 $? $");
        assert_eq!(run("echo ${PREFIX:-/usr}"), "echo ${PREFIX:-/usr}");
        assert_eq!(run("echo ${PREFIX"), "echo ${PREFIX");
    }

    #[test]
    fn test_dollar_escape() {
        assert_eq!(run("echo $$PREFIX"), "echo $PREFIX");
        assert_eq!(run("price: $$5"), "price: $5");
    }

    #[test]
    fn test_no_variables() {
        assert_eq!(run("make bootstrap"), "make bootstrap");
        assert_eq!(run(""), "");
    }
}
