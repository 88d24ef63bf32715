use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

/// Reads a whole text file into memory.
pub(crate) fn read_to_string<P: AsRef<Path>>(filename: P) -> io::Result<String> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents)
}

/// Builds an output path next to `input_path` with an extra suffix.
///
/// Example:
/// `cache/completions.json` + `"token_position_tree.json"` →
/// `cache/completions.token_position_tree.json`
pub fn build_output_path<P: AsRef<Path>>(input_path: P, suffix: &str) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut name = file_stem.to_os_string();
	name.push(".");
	name.push(suffix);

	Ok(parent.join(name))
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./cache/run-1.json"` → `"run-1"`
/// - `"run-1.json"` → `"run-1"`
pub fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub fn normalize_folder(input: &str) -> PathBuf {
	if input == "." || input == "./" {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		PathBuf::from(input)
	}
}

/// Lists the stems of all files with a given extension in a directory.
///
/// Results are sorted so listings do not depend on directory order.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			files.push(get_filename(&path)?);
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn output_path_appends_suffix() {
		let path = build_output_path("cache/run/completions.json", "token.json").unwrap();
		assert_eq!(path, PathBuf::from("cache/run/completions.token.json"));
	}

	#[test]
	fn filename_drops_extension() {
		assert_eq!(get_filename("./cache/run-1.json").unwrap(), "run-1");
		assert!(get_filename("").is_err());
	}

	#[test]
	fn dot_folder_is_current_dir() {
		assert_eq!(normalize_folder("./data"), PathBuf::from("./data"));
		assert_ne!(normalize_folder("."), PathBuf::new());
	}
}
