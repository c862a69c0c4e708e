use log::{debug, info, warn};
use std::fs::File;
use std::path::{Path, PathBuf};

use super::http_status::HttpStatus;
use super::middleware::Handler;
use super::request::Request;
use super::response::{Body, Response};
use super::url::{html_escape, percent_decode, percent_encode};

const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

/// Maps request paths onto files under a fixed root and streams them back.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn serve(&self, request: &Request) -> Response {
        let url_path = request.path();
        let fs_path = translate_path(&self.root, url_path);
        debug!("{} {} -> {:?}", request.method, url_path, fs_path);

        if fs_path.is_dir() {
            if !url_path.ends_with('/') {
                let mut location = format!("{}/", url_path);
                if let Some(query) = request.query() {
                    location.push('?');
                    location.push_str(query);
                }
                return Response::new(HttpStatus::MovedPermanently)
                    .with_header("Location", &location)
                    .with_header("Content-Length", "0");
            }

            for index in INDEX_FILES {
                let candidate = fs_path.join(index);
                if candidate.is_file() {
                    return open_file(&candidate);
                }
            }

            return list_directory(&fs_path, url_path);
        }

        if url_path.ends_with('/') {
            return Response::error(HttpStatus::NotFound, "File not found");
        }

        open_file(&fs_path)
    }
}

impl Handler for StaticFiles {
    fn handle(&self, request: &Request) -> Response {
        match request.method.as_str() {
            "GET" | "HEAD" => self.serve(request),
            "OPTIONS" => {
                Response::new(HttpStatus::NoContent).with_header("Allow", "GET, HEAD, OPTIONS")
            }
            other => Response::error(
                HttpStatus::NotImplemented,
                format!("Unsupported method ('{}')", other),
            ),
        }
    }
}

/// Resolves a URL path below `root`. Empty, `.` and `..` segments are
/// dropped so the result can never climb above the root.
pub fn translate_path(root: &Path, url_path: &str) -> PathBuf {
    let decoded = percent_decode(url_path);
    let mut path = root.to_path_buf();

    for segment in decoded.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        path.push(segment);
    }

    path
}

fn open_file(path: &Path) -> Response {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            info!("File not found: {:?} ({})", path, e);
            return Response::error(HttpStatus::NotFound, "File not found");
        }
    };

    let len = match file.metadata() {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => {
            warn!("Not a regular file: {:?}", path);
            return Response::error(HttpStatus::NotFound, "File not found");
        }
        Err(e) => {
            warn!("Error getting metadata for {:?}: {}", path, e);
            return Response::error(HttpStatus::NotFound, "File not found");
        }
    };

    Response::new(HttpStatus::Ok)
        .with_header("Content-Type", content_type(path))
        .with_header("Content-Length", &len.to_string())
        .with_body(Body::File { file, len })
}

fn list_directory(dir: &Path, url_path: &str) -> Response {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list {:?}: {}", dir, e);
            return Response::error(HttpStatus::NotFound, "No permission to list directory");
        }
    };

    let mut names: Vec<(String, String)> = entries
        .filter_map(Result::ok)
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type().ok();
            let is_symlink = file_type.map(|t| t.is_symlink()).unwrap_or(false);
            let is_dir = entry.path().is_dir();

            let (display, link) = if is_dir {
                (format!("{}/", name), format!("{}/", name))
            } else if is_symlink {
                (format!("{}@", name), name.clone())
            } else {
                (name.clone(), name)
            };
            (display, link)
        })
        .collect();

    names.sort_by_key(|(display, _)| display.to_lowercase());

    let title = format!("Directory listing for {}", html_escape(&percent_decode(url_path)));
    let mut page = format!(
        "<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<hr>\n<ul>\n"
    );
    for (display, link) in &names {
        page.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            percent_encode(link),
            html_escape(display)
        ));
    }
    page.push_str("</ul>\n<hr>\n</body>\n</html>\n");

    Response::new(HttpStatus::Ok)
        .with_header("Content-Type", "text/html; charset=utf-8")
        .with_body(Body::Bytes(page.into_bytes()))
}

fn content_type(file_path: &Path) -> &'static str {
    let ext = file_path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mime_types = &[
        ("html", "text/html"),
        ("htm", "text/html"),
        ("css", "text/css"),
        ("js", "application/javascript"),
        ("mjs", "application/javascript"),
        ("json", "application/json"),
        ("map", "application/json"),
        ("wasm", "application/wasm"),
        ("png", "image/png"),
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("gif", "image/gif"),
        ("svg", "image/svg+xml"),
        ("webp", "image/webp"),
        ("ico", "image/x-icon"),
        ("woff", "font/woff"),
        ("woff2", "font/woff2"),
        ("mp4", "video/mp4"),
        ("webm", "video/webm"),
        ("pdf", "application/pdf"),
        ("xml", "application/xml"),
        ("txt", "text/plain"),
        ("md", "text/markdown"),
        ("csv", "text/csv"),
    ];

    mime_types
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or("application/octet-stream")
}
