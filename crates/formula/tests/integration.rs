//! Integration tests for formula loading

#[cfg(test)]
mod tests {
    use kiln_errors::{Error, FormulaError};
    use kiln_formula::*;
    use std::path::Path;
    use tempfile::tempdir;

    const FFMPEG_HEAD: &str = r"
name: ffmpeg-head
source:
  uri: git://github.com/vivienschilis/ffmpeg-head.git
  method: git
deparallelize: true
prefix_variable: PREFIX_DIR
steps:
  - make bootstrap
  - make
  - cp dist/bin/* ${PREFIX_DIR}/bin
";

    #[tokio::test]
    async fn test_load_yaml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ffmpeg-head.yml");
        tokio::fs::write(&path, FFMPEG_HEAD).await.unwrap();

        let formula = load_formula(&path).await.unwrap();
        assert_eq!(formula.name, "ffmpeg-head");
        assert_eq!(formula.source.method, FetchMethod::Git);
        assert_eq!(
            formula.source.uri,
            "git://github.com/vivienschilis/ffmpeg-head.git"
        );
        assert_eq!(formula.steps[0], "make bootstrap");
        assert_eq!(formula.steps[2], "cp dist/bin/* ${PREFIX_DIR}/bin");
    }

    #[tokio::test]
    async fn test_relative_local_source_resolves_against_formula_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hello.toml");
        tokio::fs::write(
            &path,
            "name = \"hello\"\nsteps = []\n[source]\nuri = \"src\"\nmethod = \"local\"\n",
        )
        .await
        .unwrap();

        let formula = load_formula(&path).await.unwrap();
        assert_eq!(Path::new(&formula.source.uri), dir.path().join("src"));
    }

    #[tokio::test]
    async fn test_absolute_local_source_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hello.yaml");
        tokio::fs::write(
            &path,
            "name: hello\nsource: { uri: /srv/hello, method: local }\n",
        )
        .await
        .unwrap();

        let formula = load_formula(&path).await.unwrap();
        assert_eq!(formula.source.uri, "/srv/hello");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_formula(&dir.path().join("absent.yml"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Formula(FormulaError::ReadFailed { .. })
        ));
    }

    #[test]
    fn test_serializes_back_to_json() {
        let formula = parse_formula(FFMPEG_HEAD, FormulaFormat::Yaml).unwrap();
        let json = serde_json::to_value(&formula).unwrap();
        assert_eq!(json["source"]["method"], "git");
        assert_eq!(json["prefix_variable"], "PREFIX_DIR");
        assert_eq!(json["steps"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_expand_with_overrides() {
        let formula = parse_formula(FFMPEG_HEAD, FormulaFormat::Yaml).unwrap();
        let expanded = expand(&formula.steps[2], |name| {
            (name == "PREFIX_DIR").then_some("/usr/local/Cellar/ffmpeg-head/HEAD")
        });
        assert_eq!(
            expanded,
            "cp dist/bin/* /usr/local/Cellar/ffmpeg-head/HEAD/bin"
        );
    }
}
