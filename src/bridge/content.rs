// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Location of the hosted web content.

const FILE_SCHEME: &str = "file://";

/// Extracted content root and the page currently loaded from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentLocation {
    extracted_root: Option<String>,
    current_page: Option<String>,
}

impl ContentLocation {
    /// Record extracted content at `root` and return the page to load.
    ///
    /// `main_page` is taken as-is when it already contains a path, otherwise
    /// it is resolved against `root`.
    pub fn set_extracted(&mut self, root: &str, main_page: &str) -> String {
        let page = if main_page.contains('/') {
            main_page.to_string()
        } else {
            format!("{}/{}", root.trim_end_matches('/'), main_page)
        };
        self.extracted_root = Some(root.to_string());
        self.current_page = Some(page.clone());
        page
    }

    pub fn extracted_root(&self) -> Option<&str> {
        self.extracted_root.as_deref()
    }

    pub fn current_page(&self) -> Option<&str> {
        self.current_page.as_deref()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// `file://` URL for `path`. Empty paths have no URL.
pub fn file_url(path: &str) -> Option<String> {
    if path.is_empty() {
        None
    } else if path.starts_with(FILE_SCHEME) {
        Some(path.to_string())
    } else {
        Some(format!("{}{}", FILE_SCHEME, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_extracted_resolves_main_page() {
        let mut location = ContentLocation::default();
        assert_eq!(location.set_extracted("/data/h5/", "index.html"), "/data/h5/index.html");
        assert_eq!(location.extracted_root(), Some("/data/h5/"));

        assert_eq!(location.set_extracted("/data/h5", "/other/app.html"), "/other/app.html");
        assert_eq!(location.current_page(), Some("/other/app.html"));

        location.clear();
        assert!(location.current_page().is_none());
        assert!(location.extracted_root().is_none());
    }

    #[test]
    fn test_file_url() {
        assert_eq!(file_url("/tmp/a.html").as_deref(), Some("file:///tmp/a.html"));
        assert_eq!(file_url("file:///tmp/a.html").as_deref(), Some("file:///tmp/a.html"));
        assert_eq!(file_url(""), None);
    }
}
