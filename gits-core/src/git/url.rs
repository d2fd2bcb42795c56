//! Remote URL parsing

/// Parsed remote address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    /// Host (e.g., "github.com"), empty for local paths
    pub host: String,
    /// Everything between the host and the repository name
    pub namespace: String,
    /// Repository name without the `.git` suffix
    pub name: String,
}

impl RemoteUrl {
    /// Parse a remote address
    ///
    /// Supports:
    /// - `https://github.com/owner/repo(.git)`
    /// - `ssh://git@host:2222/group/sub/repo.git`
    /// - `git@github.com:owner/repo.git`
    /// - `/srv/git/repo.git` and `file:///srv/git/repo.git`
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        // scp-like: git@github.com:owner/repo.git
        if !input.contains("://") {
            if let Some((user_host, path)) = input.split_once(':') {
                if !user_host.contains('/') {
                    let host = user_host.rsplit('@').next().unwrap_or(user_host);
                    return Self::from_parts(host, path);
                }
            }
            return Self::from_parts("", input);
        }

        let url = url::Url::parse(input).ok()?;
        let host = url.host_str().unwrap_or("").to_string();
        Self::from_parts(&host, url.path())
    }

    fn from_parts(host: &str, path: &str) -> Option<Self> {
        let path = path.trim_matches('/');
        let (namespace, name) = match path.rsplit_once('/') {
            Some((ns, name)) => (ns, name),
            None => ("", path),
        };
        let name = strip_extension(name);
        if name.is_empty() {
            return None;
        }
        Some(Self {
            host: host.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    /// Directory name a clone of this remote gets by default
    pub fn dir_name(&self) -> &str {
        &self.name
    }
}

/// Directory name derived from the last segment of a clone address
pub fn dir_name_from_source(src: &str) -> Option<String> {
    RemoteUrl::parse(src).map(|url| url.dir_name().to_string())
}

fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}
