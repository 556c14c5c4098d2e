use crate::config::Config;

pub const FILE_NAME: &str = ".htaccess";

/// Apache rewrite rules proxying the install prefix to the local server,
/// leaving the upload and result folders to Apache.
pub fn render(cfg: &Config) -> String {
    let prefix = normalize_prefix(&cfg.install.url_prefix);
    let uploads = cfg.paths.upload_dir.trim_matches('/');
    let results = cfg.paths.results_dir.trim_matches('/');
    format!(
        "RewriteEngine On\n\
         RewriteCond %{{REQUEST_URI}} !^{prefix}/{uploads}/\n\
         RewriteCond %{{REQUEST_URI}} !^{prefix}/{results}/\n\
         RewriteRule ^(.*)$ http://127.0.0.1:{port}/$1 [P,L]\n",
        port = cfg.server.port,
    )
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
