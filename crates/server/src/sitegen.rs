//! Docsite build pipeline.
//!
//! Runs as a spawned task after `POST /api/sites/{id}/builds` claims the
//! site. Collects the space's live documents, renders a static site under
//! the tenant's data dir, optionally notifies a deploy hook, and streams
//! progress events over the site's SSE channel. Every status transition is
//! persisted so the pipeline survives observation gaps.

use std::path::Path;
use std::sync::Arc;

use jolli_api::db;
use jolli_api::{BuildPhase, BuildProgressEvent, SiteStatus};

use crate::events::EventHub;
use crate::storage::{sq_execute, sq_query_map, TenantDb};

/// Inputs for one pipeline run.
pub struct BuildJob {
    pub tenant_slug: String,
    pub site_id: String,
    pub build_id: String,
    pub space_id: String,
    pub deploy_hook_url: Option<String>,
}

struct Page {
    title: String,
    path: String,
    content: String,
}

pub async fn run_build(db: TenantDb, hub: Arc<EventHub>, http: reqwest::Client, job: BuildJob) {
    let key = EventHub::site_key(&job.site_id);
    emit(&hub, &key, &job, BuildPhase::Queued, None);

    match pipeline(&db, &hub, &key, &http, &job).await {
        Ok(deployment_url) => {
            let persisted = {
                let conn = db.conn();
                sq_execute(
                    &conn,
                    db::sites::finish_build(
                        &job.site_id,
                        SiteStatus::Ready.as_str(),
                        deployment_url.as_deref(),
                    ),
                )
            };
            if let Err(e) = persisted {
                tracing::error!("persisting build result for {}: {e}", job.site_id);
            }
            emit(&hub, &key, &job, BuildPhase::Ready, deployment_url);
        }
        Err(e) => {
            tracing::error!("site build {} failed: {e}", job.build_id);
            let persisted = {
                let conn = db.conn();
                sq_execute(
                    &conn,
                    db::sites::finish_build(&job.site_id, SiteStatus::Failed.as_str(), None),
                )
            };
            if let Err(e) = persisted {
                tracing::error!("persisting build failure for {}: {e}", job.site_id);
            }
            emit(&hub, &key, &job, BuildPhase::Failed, Some(e.to_string()));
        }
    }
}

async fn pipeline(
    db: &TenantDb,
    hub: &EventHub,
    key: &str,
    http: &reqwest::Client,
    job: &BuildJob,
) -> anyhow::Result<Option<String>> {
    emit(hub, key, job, BuildPhase::Collecting, None);
    let pages = collect_pages(db, &job.space_id)?;

    emit(
        hub,
        key,
        job,
        BuildPhase::Generating,
        Some(format!("{} pages", pages.len())),
    );
    let out_dir = db
        .sites_dir()
        .join(&job.site_id)
        .join(&job.build_id);
    generate_site(&out_dir, &job.tenant_slug, &pages)?;

    let Some(hook_url) = job.deploy_hook_url.as_deref() else {
        return Ok(None);
    };

    {
        let conn = db.conn();
        sq_execute(
            &conn,
            db::sites::set_status(&job.site_id, SiteStatus::Deploying.as_str()),
        )?;
    }
    emit(hub, key, job, BuildPhase::Deploying, None);

    // Deploy notification is best-effort: a dead hook must not fail the build.
    let manifest = serde_json::json!({
        "tenant": job.tenant_slug,
        "site_id": job.site_id,
        "build_id": job.build_id,
        "pages": pages.len(),
        "output_dir": out_dir.display().to_string(),
    });
    match http.post(hook_url).json(&manifest).send().await {
        Ok(resp) => {
            let url = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("url").and_then(|u| u.as_str()).map(str::to_string));
            Ok(url)
        }
        Err(e) => {
            tracing::warn!("deploy hook {hook_url}: {e}");
            Ok(None)
        }
    }
}

fn collect_pages(db: &TenantDb, space_id: &str) -> anyhow::Result<Vec<Page>> {
    let conn = db.conn();
    let pages = sq_query_map(&conn, db::docs::list_space(space_id), |row| {
        Ok(Page {
            title: row.get(3)?,
            path: row.get(5)?,
            content: row.get(6)?,
        })
    })?;
    Ok(pages)
}

fn generate_site(out_dir: &Path, tenant_slug: &str, pages: &[Page]) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir)?;

    let mut index = String::from("<!doctype html>\n<html><head><meta charset=\"utf-8\">");
    index.push_str(&format!("<title>{}</title></head><body>\n", escape(tenant_slug)));
    index.push_str("<ul>\n");
    for page in pages {
        let href = page_file(&page.path);
        index.push_str(&format!(
            "<li><a href=\"{href}\">{}</a></li>\n",
            escape(&page.title)
        ));
    }
    index.push_str("</ul>\n</body></html>\n");
    std::fs::write(out_dir.join("index.html"), index)?;

    for page in pages {
        let file = out_dir.join(page_file(&page.path));
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let html = format!(
            "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head>\n\
             <body>\n<h1>{}</h1>\n<pre>{}</pre>\n</body></html>\n",
            escape(&page.title),
            escape(&page.title),
            escape(&page.content),
        );
        std::fs::write(file, html)?;
    }
    Ok(())
}

/// Output file for a document path (`/guides/install` → `guides/install.html`).
fn page_file(path: &str) -> String {
    format!("{}.html", path.trim_start_matches('/'))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn emit(hub: &EventHub, key: &str, job: &BuildJob, phase: BuildPhase, detail: Option<String>) {
    let event = BuildProgressEvent {
        site_id: job.site_id.clone(),
        build_id: job.build_id.clone(),
        phase,
        detail,
        at: chrono::Utc::now().to_rfc3339(),
    };
    match serde_json::to_string(&event) {
        Ok(json) => hub.publish(key, json),
        Err(e) => tracing::error!("serializing build event: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_file_strips_leading_slash() {
        assert_eq!(page_file("/guides/install"), "guides/install.html");
        assert_eq!(page_file("/intro"), "intro.html");
    }

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(escape("<b>&\"x\"</b>"), "&lt;b&gt;&amp;&quot;x&quot;&lt;/b&gt;");
    }

    #[test]
    fn generate_writes_index_and_pages() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec![
            Page {
                title: "Intro".into(),
                path: "/intro".into(),
                content: "hello".into(),
            },
            Page {
                title: "Install".into(),
                path: "/guides/install".into(),
                content: "steps".into(),
            },
        ];
        let out = dir.path().join("out");
        generate_site(&out, "acme", &pages).unwrap();

        assert!(out.join("index.html").exists());
        assert!(out.join("intro.html").exists());
        assert!(out.join("guides/install.html").exists());
        let index = std::fs::read_to_string(out.join("index.html")).unwrap();
        assert!(index.contains("guides/install.html"));
    }
}
