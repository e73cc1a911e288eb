use common::http::ext::OptionExt;
use common::http::{empty_response, json_response};
use hyper::{Body, Request, Response, StatusCode};
use uuid::Uuid;

use super::error::Result;
use super::ext::RequestExt;
use super::request::{self, bad_request, present, require};
use super::Builder;
use crate::database::{NewUser, User, UserPatch, UserStats};
use crate::global::ApiGlobal;

#[derive(serde::Deserialize)]
struct UserQuery {
	id: Option<Uuid>,
	username: Option<String>,
	search: Option<String>,
	limit: Option<i64>,
}

#[derive(serde::Deserialize)]
struct CreateUser {
	id: Option<Uuid>,
	username: Option<String>,
	display_name: Option<String>,
	email: Option<String>,
	avatar_url: Option<String>,
	bio: Option<String>,
}

#[derive(serde::Deserialize)]
struct UpdateUser {
	username: Option<String>,
	display_name: Option<String>,
	avatar_url: Option<String>,
	bio: Option<String>,
}

#[derive(serde::Serialize)]
struct UserWithStats {
	#[serde(flatten)]
	user: User,
	#[serde(flatten)]
	stats: UserStats,
}

async fn with_stats<G: ApiGlobal>(global: &G, user: Option<User>) -> Result<Response<Body>> {
	let user = user.map_err_route((StatusCode::NOT_FOUND, "User not found"))?;
	let stats = global.store().user_stats(user.id).await?;

	Ok(json_response(StatusCode::OK, &UserWithStats { user, stats }))
}

async fn get<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: UserQuery = request::query(&req)?;

	if let Some(id) = query.id {
		let user = global.store().get_user(id).await?;
		return with_stats(global.as_ref(), user).await;
	}

	if let Some(username) = query.username {
		let user = global.store().get_user_by_username(&username).await?;
		return with_stats(global.as_ref(), user).await;
	}

	let users = global
		.store()
		.search_users(query.search.as_deref().filter(|s| !s.trim().is_empty()), request::limit(query.limit))
		.await?;

	Ok(json_response(StatusCode::OK, &users))
}

async fn create<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let body: CreateUser = request::json(global.as_ref(), &mut req).await?;

	let username = present(body.username);
	require!(username);

	User::validate_username(&username).map_err(bad_request)?;

	let display_name = present(body.display_name).unwrap_or_else(|| username.clone());
	User::validate_display_name(&display_name).map_err(bad_request)?;

	if let Some(bio) = &body.bio {
		User::validate_bio(bio).map_err(bad_request)?;
	}

	let user = global
		.store()
		.create_user(NewUser {
			id: body.id.unwrap_or_else(Uuid::new_v4),
			username,
			display_name,
			email: present(body.email),
			avatar_url: present(body.avatar_url),
			bio: present(body.bio),
		})
		.await?;

	tracing::info!(user_id = %user.id, username = %user.username, "user created");

	Ok(json_response(StatusCode::CREATED, &user))
}

async fn update<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: UserQuery = request::query(&req)?;
	let body: UpdateUser = request::json(global.as_ref(), &mut req).await?;

	let id = query.id;
	require!(id);

	if let Some(username) = &body.username {
		User::validate_username(username).map_err(bad_request)?;
	}

	if let Some(display_name) = &body.display_name {
		User::validate_display_name(display_name).map_err(bad_request)?;
	}

	if let Some(bio) = &body.bio {
		User::validate_bio(bio).map_err(bad_request)?;
	}

	let patch = UserPatch {
		username: body.username,
		display_name: body.display_name,
		avatar_url: body.avatar_url,
		bio: body.bio,
	};

	if patch.is_empty() {
		return Err(bad_request("No fields to update"));
	}

	let user = global
		.store()
		.update_user(id, patch)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "User not found"))?;

	Ok(json_response(StatusCode::OK, &user))
}

async fn delete<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: UserQuery = request::query(&req)?;

	let id = query.id;
	require!(id);

	if !global.store().delete_user(id).await? {
		return Err((StatusCode::NOT_FOUND, "User not found").into());
	}

	tracing::info!(user_id = %id, "user deleted");

	Ok(empty_response(StatusCode::NO_CONTENT))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router
		.get("/api/users", get::<G>)
		.post("/api/users", create::<G>)
		.put("/api/users", update::<G>)
		.delete("/api/users", delete::<G>)
}
