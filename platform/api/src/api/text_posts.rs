use common::http::ext::OptionExt;
use common::http::{empty_response, json_response};
use hyper::{Body, Request, Response, StatusCode};
use uuid::Uuid;

use super::error::Result;
use super::ext::RequestExt;
use super::request::{self, bad_request, present, require};
use super::Builder;
use crate::database::{
	validate_category, validate_content, validate_title, NewTextPost, TextPost, TextPostFilter, TextPostPatch,
};
use crate::global::ApiGlobal;

#[derive(serde::Deserialize)]
struct TextPostQuery {
	id: Option<Uuid>,
	user_id: Option<Uuid>,
	category: Option<String>,
	limit: Option<i64>,
}

#[derive(serde::Deserialize)]
struct CreateTextPost {
	user_id: Option<Uuid>,
	title: Option<String>,
	content: Option<String>,
	category: Option<String>,
}

#[derive(serde::Deserialize)]
struct UpdateTextPost {
	user_id: Option<Uuid>,
	title: Option<String>,
	content: Option<String>,
	category: Option<String>,
}

fn validate(title: Option<&str>, content: Option<&str>, category: Option<&str>) -> Result<()> {
	// An empty title clears it.
	if let Some(title) = title.filter(|title| !title.trim().is_empty()) {
		validate_title(title).map_err(bad_request)?;
	}

	if let Some(content) = content {
		validate_content(content).map_err(bad_request)?;
	}

	if let Some(category) = category {
		validate_category(category).map_err(bad_request)?;
	}

	Ok(())
}

async fn owned_post<G: ApiGlobal>(global: &G, id: Uuid, user_id: Uuid) -> Result<TextPost> {
	let post = global
		.store()
		.get_text_post(id)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Text post not found"))?;

	if post.user_id != user_id {
		return Err((StatusCode::FORBIDDEN, "You can only modify your own posts").into());
	}

	Ok(post)
}

async fn get<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: TextPostQuery = request::query(&req)?;

	if let Some(id) = query.id {
		let post = global
			.store()
			.get_text_post(id)
			.await?
			.map_err_route((StatusCode::NOT_FOUND, "Text post not found"))?;

		let owner = post.user_id;
		let post = request::with_author(global.as_ref(), post, owner).await?;
		return Ok(json_response(StatusCode::OK, &post));
	}

	let posts = global
		.store()
		.list_text_posts(TextPostFilter {
			user_id: query.user_id,
			category: present(query.category),
			limit: request::limit(query.limit),
		})
		.await?;

	let posts = request::with_authors(global.as_ref(), posts, |p| p.user_id).await?;

	Ok(json_response(StatusCode::OK, &posts))
}

async fn create<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let body: CreateTextPost = request::json(global.as_ref(), &mut req).await?;

	let user_id = body.user_id;
	let content = present(body.content);
	require!(user_id, content);

	validate(body.title.as_deref(), Some(&content), body.category.as_deref())?;

	let post = global
		.store()
		.create_text_post(NewTextPost {
			user_id,
			title: present(body.title),
			content,
			category: present(body.category),
		})
		.await?;

	tracing::info!(text_post_id = %post.id, user_id = %user_id, "text post created");

	Ok(json_response(StatusCode::CREATED, &post))
}

async fn update<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: TextPostQuery = request::query(&req)?;
	let body: UpdateTextPost = request::json(global.as_ref(), &mut req).await?;

	let id = query.id;
	let user_id = body.user_id;
	require!(id, user_id);

	validate(body.title.as_deref(), body.content.as_deref(), body.category.as_deref())?;

	owned_post(global.as_ref(), id, user_id).await?;

	let patch = TextPostPatch {
		title: body.title,
		content: body.content,
		category: body.category,
	};

	if patch.is_empty() {
		return Err(bad_request("No fields to update"));
	}

	let post = global
		.store()
		.update_text_post(id, patch)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Text post not found"))?;

	Ok(json_response(StatusCode::OK, &post))
}

async fn delete<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: TextPostQuery = request::query(&req)?;

	let id = query.id;
	let user_id = query.user_id;
	require!(id, user_id);

	owned_post(global.as_ref(), id, user_id).await?;

	if !global.store().delete_text_post(id).await? {
		return Err((StatusCode::NOT_FOUND, "Text post not found").into());
	}

	tracing::info!(text_post_id = %id, "text post deleted");

	Ok(empty_response(StatusCode::NO_CONTENT))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router
		.get("/api/text-posts", get::<G>)
		.post("/api/text-posts", create::<G>)
		.put("/api/text-posts", update::<G>)
		.delete("/api/text-posts", delete::<G>)
}
