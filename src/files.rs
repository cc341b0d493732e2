// src/files.rs
// Static file route: serves the asset source with index resolution

use actix_files::NamedFile;
use actix_web::http::header::{self, EntityTag, Header, IfNoneMatch, ETag};
use actix_web::http::Method;
use actix_web::{web, HttpRequest, HttpResponse};

use crate::assets::{clean_path, Asset, AssetBody, AssetSource, INDEX_FILE};
use crate::error::AssetError;
use crate::logger::Logger;

fn index_of(dir: &str) -> String {
    if dir.is_empty() {
        INDEX_FILE.to_string()
    } else {
        format!("{}/{}", dir, INDEX_FILE)
    }
}

/// Catch-all handler for every path not claimed by another route.
pub async fn serve_asset(
    req: HttpRequest,
    assets: web::Data<dyn AssetSource>,
    logger: web::Data<Logger>,
) -> HttpResponse {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return HttpResponse::MethodNotAllowed()
            .insert_header((header::ALLOW, "GET, HEAD"))
            .finish();
    }

    let decoded = match urlencoding::decode(req.path()) {
        Ok(path) => path.into_owned(),
        Err(_) => return HttpResponse::BadRequest().body("Invalid path encoding"),
    };

    let Some(cleaned) = clean_path(&decoded) else {
        return HttpResponse::Forbidden().body("Invalid path");
    };

    let wants_directory = cleaned.is_empty() || decoded.ends_with('/');
    let candidate = if wants_directory {
        index_of(&cleaned)
    } else {
        cleaned.clone()
    };

    log::debug!("Resolving {} to asset {}", req.path(), candidate);

    match assets.open(&candidate) {
        Ok(asset) => respond_with_asset(&req, asset).await,
        Err(AssetError::NotFound(_)) if !wants_directory => {
            // A directory requested without its trailing slash.
            if assets.open(&index_of(&cleaned)).is_ok() {
                let mut location = format!("{}/", req.path());
                if !req.query_string().is_empty() {
                    location.push('?');
                    location.push_str(req.query_string());
                }
                return HttpResponse::MovedPermanently()
                    .insert_header((header::LOCATION, location))
                    .finish();
            }
            not_found()
        }
        Err(AssetError::NotFound(_)) => not_found(),
        Err(AssetError::Forbidden(path)) => {
            log::debug!("Refusing to serve {}", path);
            HttpResponse::Forbidden().body("403 forbidden")
        }
        Err(err) => {
            logger.error(&format!("error serving {}: {}", candidate, err));
            HttpResponse::InternalServerError().body("500 internal server error")
        }
    }
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type(mime::TEXT_PLAIN_UTF_8)
        .body("404 page not found")
}

async fn respond_with_asset(req: &HttpRequest, asset: Asset) -> HttpResponse {
    match asset.body {
        AssetBody::File(path) => match NamedFile::open_async(&path).await {
            Ok(file) => file
                .use_etag(true)
                .use_last_modified(true)
                .into_response(req),
            Err(err) => {
                log::debug!("Failed to open {}: {}", path.display(), err);
                not_found()
            }
        },
        AssetBody::Bytes(data) => {
            let etag = asset.etag.map(EntityTag::new_strong);

            if let Some(ref tag) = etag {
                if none_match_hits(req, tag) {
                    return HttpResponse::NotModified()
                        .insert_header(ETag(tag.clone()))
                        .finish();
                }
            }

            let content_type = mime_guess::from_path(&asset.path).first_or_octet_stream();
            let mut response = HttpResponse::Ok();
            response.content_type(content_type);
            if let Some(tag) = etag {
                response.insert_header(ETag(tag));
            }
            response.body(data)
        }
    }
}

fn none_match_hits(req: &HttpRequest, tag: &EntityTag) -> bool {
    match IfNoneMatch::parse(req) {
        Ok(IfNoneMatch::Any) => true,
        Ok(IfNoneMatch::Items(items)) => items.iter().any(|item| item.weak_eq(tag)),
        Err(_) => false,
    }
}
