//! Listing-site crawler and PDF downloader.
//!
//! Walks a source's project listing breadth first (pagination, detail pages
//! and `<link rel="next">`), collects every PDF link on the same site, and
//! mirrors the files into a local cache directory.

use fiches_core::profiles::schema::CrawlDef;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_LENGTH;
use scraper::{Html, Selector};
use tempfile::NamedTempFile;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::CliError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/120.0.0.0 Safari/537.36";

/// Links found on one listing page.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub pdfs: Vec<Url>,
    pub follow: Vec<Url>,
}

struct LinkSelectors {
    anchor: Selector,
    link: Selector,
}

impl LinkSelectors {
    fn new() -> Result<Self, CliError> {
        Ok(LinkSelectors {
            anchor: parse_selector("a[href]")?,
            link: parse_selector("link[href]")?,
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector, CliError> {
    Selector::parse(selector).map_err(|e| CliError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Crawl scope for one source.
pub struct Scope {
    start: Url,
    host_suffix: String,
    path_prefix: String,
}

impl Scope {
    pub fn new(def: &CrawlDef) -> Result<Self, CliError> {
        let start = Url::parse(&def.start_url).map_err(|source| CliError::Url {
            url: def.start_url.clone(),
            source,
        })?;
        Ok(Scope {
            start,
            host_suffix: def.host_suffix.to_lowercase(),
            path_prefix: def.path_prefix.clone(),
        })
    }

    fn same_site(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|h| h.to_lowercase().ends_with(&self.host_suffix))
    }

    fn in_listing(&self, url: &Url) -> bool {
        url.path().contains(&self.path_prefix)
    }

    // Pagination, the start page itself, or a detail page below it.
    fn worth_following(&self, url: &Url) -> bool {
        let start = self.start.as_str().trim_end_matches('/');
        let target = url.as_str();
        url.query().is_some_and(|q| q.contains("page="))
            || target.trim_end_matches('/') == start
            || target.starts_with(&format!("{start}/"))
    }
}

/// Sort the links of one page into PDFs and pages to visit next.
pub fn classify_links(html: &str, page_url: &Url, scope: &Scope) -> Result<PageLinks, CliError> {
    let selectors = LinkSelectors::new()?;
    let document = Html::parse_document(html);
    let mut links = PageLinks::default();

    for a in document.select(&selectors.anchor) {
        let Some(url) = a.value().attr("href").and_then(|h| resolve(page_url, h)) else {
            continue;
        };
        if !scope.same_site(&url) {
            continue;
        }
        if url.as_str().to_lowercase().contains(".pdf") {
            links.pdfs.push(url);
        } else if scope.in_listing(&url) && scope.worth_following(&url) {
            links.follow.push(url);
        }
    }

    for link in document.select(&selectors.link) {
        let is_next = link
            .value()
            .attr("rel")
            .is_some_and(|rel| rel.to_lowercase().split_whitespace().any(|r| r == "next"));
        if !is_next {
            continue;
        }
        if let Some(url) = link.value().attr("href").and_then(|h| resolve(page_url, h)) {
            if scope.same_site(&url) && scope.in_listing(&url) {
                links.follow.push(url);
            }
        }
    }

    Ok(links)
}

// Absolute URL without fragment.
fn resolve(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    Some(url)
}

/// Local file name for a PDF URL: its last path segment, with a `.pdf`
/// extension.
pub fn file_name_for(url: &Url) -> String {
    let name = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("document.pdf");
    if name.to_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}

#[derive(Debug, Default)]
pub struct DownloadStats {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct Crawler {
    client: Client,
    scope: Scope,
    max_pages: usize,
}

impl Crawler {
    pub fn new(def: &CrawlDef) -> Result<Self, CliError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Crawler {
            client,
            scope: Scope::new(def)?,
            max_pages: def.max_pages,
        })
    }

    /// Every PDF URL reachable from the start page, sorted. Pages that fail
    /// to load are logged and skipped.
    pub fn collect_pdf_urls(&self) -> Result<BTreeSet<Url>, CliError> {
        let mut pdfs = BTreeSet::new();
        let mut visited: HashSet<Url> = HashSet::new();
        let mut queue: VecDeque<Url> = VecDeque::from([self.scope.start.clone()]);

        while visited.len() < self.max_pages {
            let Some(url) = queue.pop_front() else {
                break;
            };
            if !visited.insert(url.clone()) {
                continue;
            }

            let html = match self.fetch_page(&url) {
                Ok(html) => html,
                Err(e) => {
                    warn!(url = %url, "listing page skipped: {e}");
                    continue;
                }
            };
            let links = classify_links(&html, &url, &self.scope)?;
            debug!(
                url = %url,
                pdfs = links.pdfs.len(),
                follow = links.follow.len(),
                "listing page read"
            );
            pdfs.extend(links.pdfs);
            queue.extend(links.follow.into_iter().filter(|u| !visited.contains(u)));
        }

        info!(pages = visited.len(), pdfs = pdfs.len(), "crawl finished");
        Ok(pdfs)
    }

    fn fetch_page(&self, url: &Url) -> Result<String, CliError> {
        let resp = self
            .client
            .get(url.clone())
            .timeout(Duration::from_secs(25))
            .send()?
            .error_for_status()?;
        Ok(resp.text()?)
    }

    /// Download every URL into `dest`. Individual failures are logged and
    /// counted; they never stop the run.
    pub fn download_all(&self, urls: &BTreeSet<Url>, dest: &Path) -> Result<DownloadStats, CliError> {
        fs::create_dir_all(dest)?;
        let total = urls.len();
        let mut stats = DownloadStats::default();
        for (i, url) in urls.iter().enumerate() {
            let path = dest.join(file_name_for(url));
            match self.download(url, &path) {
                Ok(true) => {
                    stats.downloaded += 1;
                    info!("[{}/{}] downloaded {}", i + 1, total, path.display());
                }
                Ok(false) => {
                    stats.skipped += 1;
                    debug!(path = %path.display(), "local copy is current");
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(url = %url, "download failed: {e}");
                }
            }
        }
        Ok(stats)
    }

    // True when the file was (re)written.
    fn download(&self, url: &Url, path: &Path) -> Result<bool, CliError> {
        if let Some(local_len) = fs::metadata(path).ok().map(|m| m.len()).filter(|n| *n > 0) {
            match self.remote_len(url) {
                Ok(Some(remote_len)) if remote_len == local_len => return Ok(false),
                Ok(_) => {}
                Err(e) => {
                    // Keep the local copy rather than fetch everything again.
                    debug!(url = %url, "size check failed, keeping local copy: {e}");
                    return Ok(false);
                }
            }
        }

        let mut resp = self.client.get(url.clone()).send()?.error_for_status()?;
        save_atomically(&mut resp, path)?;
        Ok(true)
    }

    fn remote_len(&self, url: &Url) -> Result<Option<u64>, CliError> {
        let resp = self
            .client
            .head(url.clone())
            .timeout(Duration::from_secs(15))
            .send()?;
        Ok(resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|n| *n > 0))
    }
}

/// Copy `body` into a temporary sibling of `path` and rename it into place
/// once complete. An interrupted copy leaves `path` untouched.
fn save_atomically<R: Read>(body: &mut R, path: &Path) -> Result<(), CliError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    io::copy(body, tmp.as_file_mut())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Crawl the listing and mirror its PDFs into `dest`.
pub fn mirror(def: &CrawlDef, dest: &Path) -> Result<DownloadStats, CliError> {
    let crawler = Crawler::new(def)?;
    info!(start = %def.start_url, "crawling listing");
    let urls = crawler.collect_pdf_urls()?;
    if urls.is_empty() {
        warn!("no PDF links found on the listing");
        return Ok(DownloadStats::default());
    }
    crawler.download_all(&urls, dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Scope {
        Scope::new(&CrawlDef {
            start_url: "https://coeurdumaroc.ma/fr/projects".into(),
            host_suffix: "coeurdumaroc.ma".into(),
            path_prefix: "/fr/projects".into(),
            max_pages: 200,
        })
        .unwrap()
    }

    fn page_url() -> Url {
        Url::parse("https://coeurdumaroc.ma/fr/projects?page=2").unwrap()
    }

    fn strings(urls: &[Url]) -> Vec<&str> {
        urls.iter().map(|u| u.as_str()).collect()
    }

    #[test]
    fn test_pdf_links_are_resolved_and_filtered() {
        let html = r#"
            <a href="/uploads/fiche-huilerie.pdf#page=1">PDF</a>
            <a href="https://cdn.coeurdumaroc.ma/docs/Fiche.PDF">PDF</a>
            <a href="https://example.com/other.pdf">ailleurs</a>
            <a href="">vide</a>
        "#;
        let links = classify_links(html, &page_url(), &scope()).unwrap();
        assert_eq!(
            strings(&links.pdfs),
            vec![
                "https://coeurdumaroc.ma/uploads/fiche-huilerie.pdf",
                "https://cdn.coeurdumaroc.ma/docs/Fiche.PDF",
            ]
        );
    }

    #[test]
    fn test_listing_links_to_follow() {
        let html = r#"
            <a href="/fr/projects?page=3">suivant</a>
            <a href="/fr/projects/unite-de-trituration">détail</a>
            <a href="/fr/projects/">liste</a>
            <a href="/fr/actualites">actualités</a>
            <a href="/fr/projectsarchive">archive</a>
            <link rel="Next" href="/fr/projects?page=4">
            <link rel="stylesheet" href="/fr/projects/style.css">
        "#;
        let links = classify_links(html, &page_url(), &scope()).unwrap();
        assert_eq!(
            strings(&links.follow),
            vec![
                "https://coeurdumaroc.ma/fr/projects?page=3",
                "https://coeurdumaroc.ma/fr/projects/unite-de-trituration",
                "https://coeurdumaroc.ma/fr/projects/",
                "https://coeurdumaroc.ma/fr/projects?page=4",
            ]
        );
        assert!(links.pdfs.is_empty());
    }

    #[test]
    fn test_file_name_for_url() {
        let url = |s: &str| Url::parse(s).unwrap();
        assert_eq!(
            file_name_for(&url("https://coeurdumaroc.ma/uploads/Fiche-PR12.pdf?v=2")),
            "Fiche-PR12.pdf"
        );
        assert_eq!(
            file_name_for(&url("https://coeurdumaroc.ma/download/1234")),
            "1234.pdf"
        );
        assert_eq!(file_name_for(&url("https://coeurdumaroc.ma/")), "document.pdf");
    }

    #[test]
    fn test_invalid_start_url() {
        let def = CrawlDef {
            start_url: "not a url".into(),
            host_suffix: "x".into(),
            path_prefix: "/".into(),
            max_pages: 1,
        };
        assert!(matches!(Scope::new(&def), Err(CliError::Url { .. })));
    }

    #[test]
    fn test_save_atomically_writes_complete_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fiche.pdf");
        save_atomically(&mut &b"%PDF-1.7 body"[..], &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.7 body");
    }

    struct BrokenBody {
        sent: bool,
    }

    impl Read for BrokenBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"%PDF");
            Ok(4)
        }
    }

    #[test]
    fn test_interrupted_download_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fiche.pdf");
        assert!(save_atomically(&mut BrokenBody { sent: false }, &path).is_err());
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_interrupted_download_keeps_previous_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fiche.pdf");
        fs::write(&path, b"previous").unwrap();
        assert!(save_atomically(&mut BrokenBody { sent: false }, &path).is_err());
        assert_eq!(fs::read(&path).unwrap(), b"previous");
    }
}
