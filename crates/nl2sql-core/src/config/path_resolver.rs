use std::path::{Path, PathBuf};

/// Resolves paths written in a config file relative to that file's directory.
#[derive(Clone)]
pub struct PathResolver {
    base_dir: PathBuf,
}

impl PathResolver {
    pub fn new(config_path: &Path) -> Self {
        let base_dir = config_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve_opt_str(&self, p: &mut Option<String>) {
        if let Some(s) = p.as_mut() {
            self.resolve_str(s);
        }
    }

    pub fn resolve_str(&self, s: &mut String) {
        if s.trim().is_empty() {
            return;
        }
        let pb = PathBuf::from(&*s);
        if pb.is_absolute() {
            return;
        }

        let joined = self.join_clean(&pb);
        *s = joined.to_string_lossy().to_string();
    }

    fn join_clean(&self, rel: &Path) -> PathBuf {
        let joined = self.base_dir.join(rel);

        let mut out = PathBuf::new();
        for c in joined.components() {
            use std::path::Component::*;
            match c {
                CurDir => {}
                ParentDir => {
                    out.pop();
                }
                RootDir | Prefix(_) | Normal(_) => out.push(c.as_os_str()),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_to_config_dir() {
        let r = PathResolver::new(Path::new("/bench/configs/nl2sql.yaml"));
        let mut s = "../data/pairs.csv".to_string();
        r.resolve_str(&mut s);
        assert_eq!(PathBuf::from(s), PathBuf::from("/bench/data/pairs.csv"));
    }

    #[test]
    fn leaves_absolute_and_empty_paths_alone() {
        let r = PathResolver::new(Path::new("/bench/nl2sql.yaml"));
        let mut abs = "/srv/products.db".to_string();
        r.resolve_str(&mut abs);
        assert_eq!(abs, "/srv/products.db");

        let mut none: Option<String> = None;
        r.resolve_opt_str(&mut none);
        assert!(none.is_none());

        let mut blank = Some("  ".to_string());
        r.resolve_opt_str(&mut blank);
        assert_eq!(blank.as_deref(), Some("  "));
    }
}
