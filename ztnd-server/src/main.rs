use std::path::PathBuf;
use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, put, web};
use log::{error, info, warn};
use serde::Deserialize;

use ztnd_core::capture::load_sequences;
use ztnd_core::io::{list_files, normalize_folder};
use ztnd_core::{BuildOptions, GraphError, GraphMode, NodeId, NodeLinkData, Sequence, build, layout};

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;

/// Server settings read from the environment.
///
/// - `ZTND_DATA_DIR`: folder holding `*.json` capture files (default `./data`)
/// - `ZTND_HOST`: bind address (default `127.0.0.1`)
/// - `ZTND_PORT`: bind port (default `5000`, invalid values fall back to it)
#[derive(Debug, Clone)]
struct ServerConfig {
	data_dir: PathBuf,
	host: String,
	port: u16,
}

impl ServerConfig {
	fn from_env() -> Self {
		let data_dir = std::env::var("ZTND_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_owned());
		let host = std::env::var("ZTND_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_owned());
		let port = std::env::var("ZTND_PORT")
			.ok()
			.and_then(|v| v.parse::<u16>().ok())
			.unwrap_or(DEFAULT_PORT);
		Self { data_dir: normalize_folder(&data_dir), host, port }
	}
}

/// Query parameters of the `/v1/graph` endpoint.
#[derive(Deserialize)]
struct GraphParams {
	mode: Option<String>,
	root: Option<usize>,
	provenance: Option<bool>,
}

#[derive(Deserialize)]
struct CaptureQuery {
	names: Option<String>,
}

struct SharedData {
	data_dir: PathBuf,
	captures: Vec<String>,
	sequences: Vec<Sequence>,
}

impl GraphParams {
	/// Build options derived from the query, defaulting to the divergence tree.
	fn build_options(&self) -> Result<BuildOptions, GraphError> {
		let mode = match &self.mode {
			Some(mode) => mode.parse::<GraphMode>()?,
			None => GraphMode::default(),
		};
		Ok(BuildOptions::new(mode).with_provenance(self.provenance.unwrap_or(true)))
	}
}

/// Maps a core error to the matching HTTP response.
fn error_response(e: &GraphError) -> HttpResponse {
	match e {
		GraphError::UnknownMode(_) | GraphError::UnknownNode(_) => HttpResponse::BadRequest().body(e.to_string()),
		GraphError::MissingLogprob { .. }
		| GraphError::MissingLogprobs { .. }
		| GraphError::PositionMismatch { .. }
		| GraphError::Json(_) => HttpResponse::UnprocessableEntity().body(e.to_string()),
		_ => {
			error!("internal error: {e}");
			HttpResponse::InternalServerError().body(e.to_string())
		}
	}
}

/// HTTP GET endpoint `/v1/graph`
///
/// Builds the graph of the loaded sequences, lays it out and returns the
/// node-link document as JSON.
#[get("/v1/graph")]
async fn get_graph(data: web::Data<Mutex<SharedData>>, query: web::Query<GraphParams>) -> impl Responder {
	let options = match query.build_options() {
		Ok(options) => options,
		Err(e) => return error_response(&e),
	};

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Sequence lock failed"),
	};

	let graph = match build(&shared_data.sequences, &options) {
		Ok(graph) => graph,
		Err(e) => return error_response(&e),
	};

	let root = match query.root.map(NodeId).or_else(|| graph.default_root()) {
		Some(root) => root,
		None => return HttpResponse::Ok().json(NodeLinkData::new(&graph, None)),
	};

	match layout(&graph, root) {
		Ok(layout) => {
			if !layout.unreachable().is_empty() {
				warn!("{} nodes not reachable from {root}", layout.unreachable().len());
			}
			HttpResponse::Ok().json(NodeLinkData::new(&graph, Some(&layout)))
		}
		Err(e) => error_response(&e),
	}
}

#[get("/v1/captures")]
async fn get_captures(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let data_dir = match data.lock() {
		Ok(m) => m.data_dir.clone(),
		Err(_) => return HttpResponse::InternalServerError().body("Sequence lock failed"),
	};
	match list_files(&data_dir, "json") {
		Ok(files) => HttpResponse::Ok().body(files.join("\n")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list captures"),
	}
}

#[get("/v1/loaded_captures")]
async fn get_loaded_captures(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Sequence lock failed"),
	};
	HttpResponse::Ok().body(shared_data.captures.join("\n"))
}

/// HTTP PUT endpoint `/v1/load_captures?names=a,b`
///
/// Replaces the loaded sequences with the concatenation of the named
/// captures, in the given order. Nothing is replaced if any capture fails.
#[put("/v1/load_captures")]
async fn put_captures(data: web::Data<Mutex<SharedData>>, query: web::Query<CaptureQuery>) -> impl Responder {
	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Sequence lock failed"),
	};

	let query_names = match &query.names {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty capture name"),
	};

	let capture_names: Vec<&str> = query_names
		.split(',')
		.map(|s| s.trim())
		.filter(|s| !s.is_empty())
		.collect();

	let mut sequences = Vec::new();
	for name in &capture_names {
		let capture_path = shared_data.data_dir.join(format!("{name}.json"));
		match load_sequences(&capture_path) {
			Ok(mut loaded) => sequences.append(&mut loaded),
			Err(e) => {
				warn!("failed to load capture {name}: {e}");
				return error_response(&e);
			}
		}
	}

	info!("loaded {} sequences from {} captures", sequences.len(), capture_names.len());
	shared_data.sequences = sequences;
	shared_data.captures = capture_names.iter().map(|s| (*s).to_owned()).collect();

	HttpResponse::Ok().body("Captures loaded successfully")
}

/// Main entry point for the server.
///
/// Reads `ServerConfig` from the environment, wraps the loaded sequences in
/// a `Mutex` and starts an Actix-web HTTP server.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config = ServerConfig::from_env();
	info!("serving captures from {} on {}:{}", config.data_dir.display(), config.host, config.port);

	let shared_data = SharedData {
		data_dir: config.data_dir.clone(),
		captures: Vec::new(),
		sequences: Vec::new(),
	};
	let shared = web::Data::new(Mutex::new(shared_data));

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared.clone())
			.service(get_graph)
			.service(get_captures)
			.service(get_loaded_captures)
			.service(put_captures)
	})
		.bind((config.host.as_str(), config.port))?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use super::*;

	fn params(mode: Option<&str>, provenance: Option<bool>) -> GraphParams {
		GraphParams { mode: mode.map(str::to_owned), root: None, provenance }
	}

	#[test]
	fn graph_params_default_to_tree_with_provenance() {
		let options = params(None, None).build_options().unwrap();
		assert_eq!(options.mode, GraphMode::TokenPositionTree);
		assert!(options.track_provenance);
	}

	#[test]
	fn graph_params_parse_mode_aliases() {
		let options = params(Some("token_pos"), Some(false)).build_options().unwrap();
		assert_eq!(options.mode, GraphMode::TokenPosition);
		assert!(!options.track_provenance);
		assert!(matches!(params(Some("spiral"), None).build_options(), Err(GraphError::UnknownMode(_))));
	}

	#[test]
	fn malformed_input_maps_to_unprocessable_entity() {
		let e = GraphError::MissingLogprobs { sequence: "c-0".to_owned() };
		assert_eq!(error_response(&e).status(), actix_web::http::StatusCode::UNPROCESSABLE_ENTITY);
		let e = GraphError::UnknownNode(NodeId(9));
		assert_eq!(error_response(&e).status(), actix_web::http::StatusCode::BAD_REQUEST);
	}
}
