use common::http::ext::OptionExt;
use common::http::{empty_response, json_response};
use hyper::{Body, Request, Response, StatusCode};
use uuid::Uuid;

use super::error::Result;
use super::ext::RequestExt;
use super::request::{self, bad_request, present, require};
use super::Builder;
use crate::database::{build_threads, Comment, NewComment};
use crate::global::ApiGlobal;

#[derive(serde::Deserialize)]
struct CommentQuery {
	id: Option<Uuid>,
	user_id: Option<Uuid>,
	video_id: Option<Uuid>,
	text_post_id: Option<Uuid>,
}

#[derive(serde::Deserialize)]
struct CreateComment {
	user_id: Option<Uuid>,
	content: Option<String>,
	video_id: Option<Uuid>,
	text_post_id: Option<Uuid>,
	parent_id: Option<Uuid>,
}

#[derive(serde::Deserialize)]
struct UpdateComment {
	user_id: Option<Uuid>,
	content: Option<String>,
}

async fn owned_comment<G: ApiGlobal>(global: &G, id: Uuid, user_id: Uuid) -> Result<Comment> {
	let comment = global
		.store()
		.get_comment(id)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Comment not found"))?;

	if comment.user_id != user_id {
		return Err((StatusCode::FORBIDDEN, "You can only modify your own comments").into());
	}

	Ok(comment)
}

async fn get<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: CommentQuery = request::query(&req)?;

	if let Some(id) = query.id {
		let comment = global
			.store()
			.get_comment(id)
			.await?
			.map_err_route((StatusCode::NOT_FOUND, "Comment not found"))?;

		let owner = comment.user_id;
		let comment = request::with_author(global.as_ref(), comment, owner).await?;
		return Ok(json_response(StatusCode::OK, &comment));
	}

	let target = request::target(query.video_id, query.text_post_id)?;

	global
		.store()
		.target_counters(target)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, format!("{} not found", target.noun())))?;

	let comments = global.store().list_comments(target).await?;
	let authors = request::authors(global.as_ref(), comments.iter().map(|c| c.user_id)).await?;

	Ok(json_response(StatusCode::OK, &build_threads(comments, &authors)))
}

async fn create<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let body: CreateComment = request::json(global.as_ref(), &mut req).await?;

	let user_id = body.user_id;
	let content = present(body.content);
	require!(user_id, content);

	let target = request::target(body.video_id, body.text_post_id)?;
	Comment::validate_content(&content).map_err(bad_request)?;

	if let Some(parent_id) = body.parent_id {
		let parent = global
			.store()
			.get_comment(parent_id)
			.await?
			.map_err_route((StatusCode::NOT_FOUND, "Parent comment not found"))?;

		if parent.target() != Some(target) {
			return Err(bad_request("Parent comment belongs to different content"));
		}
	}

	let comment = global
		.store()
		.create_comment(NewComment {
			user_id,
			target,
			parent_id: body.parent_id,
			content,
		})
		.await?;

	tracing::debug!(comment_id = %comment.id, target = %target.id(), "comment created");

	let comment = request::with_author(global.as_ref(), comment, user_id).await?;

	Ok(json_response(StatusCode::CREATED, &comment))
}

async fn update<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: CommentQuery = request::query(&req)?;
	let body: UpdateComment = request::json(global.as_ref(), &mut req).await?;

	let id = query.id;
	let user_id = body.user_id;
	let content = present(body.content);
	require!(id, user_id, content);

	Comment::validate_content(&content).map_err(bad_request)?;

	owned_comment(global.as_ref(), id, user_id).await?;

	let comment = global
		.store()
		.update_comment(id, content)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Comment not found"))?;

	Ok(json_response(StatusCode::OK, &comment))
}

async fn delete<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: CommentQuery = request::query(&req)?;

	let id = query.id;
	let user_id = query.user_id;
	require!(id, user_id);

	owned_comment(global.as_ref(), id, user_id).await?;

	let removed = global
		.store()
		.delete_comment(id)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Comment not found"))?;

	tracing::debug!(comment_id = %id, removed, "comment deleted");

	Ok(empty_response(StatusCode::NO_CONTENT))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router
		.get("/api/comments", get::<G>)
		.post("/api/comments", create::<G>)
		.put("/api/comments", update::<G>)
		.delete("/api/comments", delete::<G>)
}
