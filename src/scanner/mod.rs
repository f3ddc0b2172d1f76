//! 添付メディアのスキャンと読み込み

use crate::error::{CivicError, Result};
use civic_report_common::{Artifact, Dimensions, MediaSnapshot};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub file_name: String,
    pub kind: MediaKind,
    pub mime: &'static str,
    pub modified: Option<SystemTime>,
}

const MEDIA_TYPES: &[(&str, MediaKind, &str)] = &[
    ("jpg", MediaKind::Image, "image/jpeg"),
    ("jpeg", MediaKind::Image, "image/jpeg"),
    ("png", MediaKind::Image, "image/png"),
    ("webp", MediaKind::Image, "image/webp"),
    ("webm", MediaKind::Video, "video/webm"),
    ("mp4", MediaKind::Video, "video/mp4"),
    ("mov", MediaKind::Video, "video/quicktime"),
    ("weba", MediaKind::Audio, "audio/webm"),
    ("ogg", MediaKind::Audio, "audio/ogg"),
    ("mp3", MediaKind::Audio, "audio/mpeg"),
    ("m4a", MediaKind::Audio, "audio/mp4"),
    ("wav", MediaKind::Audio, "audio/wav"),
];

/// 拡張子（大文字小文字無視）から種別とMIMEを判定
pub fn classify(path: &Path) -> Option<(MediaKind, &'static str)> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(e, _, _)| *e == ext)
        .map(|(_, kind, mime)| (*kind, *mime))
}

fn media_file(path: &Path) -> Option<MediaFile> {
    let (kind, mime) = classify(path)?;
    Some(MediaFile {
        path: path.to_path_buf(),
        file_name: path.file_name()?.to_string_lossy().to_string(),
        kind,
        mime,
        modified: std::fs::metadata(path).and_then(|m| m.modified()).ok(),
    })
}

/// フォルダ内のメディアをファイル名順で列挙
pub fn scan_folder(folder: &Path, recursive: bool) -> Result<Vec<MediaFile>> {
    if !folder.is_dir() {
        return Err(CivicError::FolderNotFound(folder.display().to_string()));
    }

    let mut files: Vec<MediaFile> = WalkDir::new(folder)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| media_file(e.path()))
        .collect();

    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    log::debug!("Found {} media files in {}", files.len(), folder.display());
    Ok(files)
}

/// 個別指定されたファイル
pub fn media_from_paths(paths: &[PathBuf]) -> Result<Vec<MediaFile>> {
    paths
        .iter()
        .map(|path| {
            if !path.is_file() {
                return Err(CivicError::MediaLoad(format!("{}: ファイルがありません", path.display())));
            }
            media_file(path).ok_or_else(|| {
                CivicError::MediaLoad(format!("{}: 対応していない形式です", path.display()))
            })
        })
        .collect()
}

/// 写真として読めて幅・高さが0でないこと
pub fn check_image(path: &Path) -> Result<Dimensions> {
    let (width, height) = image::image_dimensions(path)
        .map_err(|e| CivicError::MediaLoad(format!("{}: {}", path.display(), e)))?;
    Dimensions::non_zero(width, height)
        .ok_or_else(|| CivicError::MediaLoad(format!("{}: 画像サイズが0です", path.display())))
}

pub fn load_artifact(file: &MediaFile) -> Result<Artifact<Vec<u8>>> {
    if file.kind == MediaKind::Image {
        let dims = check_image(&file.path)?;
        log::debug!("{}: {}x{}", file.file_name, dims.width, dims.height);
    }
    let bytes = std::fs::read(&file.path)?;
    Ok(Artifact {
        url: file.path.display().to_string(),
        blob: bytes,
        file_name: Some(file.file_name.clone()),
        mime: file.mime.to_string(),
    })
}

/// 種別ごとに振り分ける（ボイスメモは新しい順）
pub fn load_media(files: &[MediaFile]) -> Result<MediaSnapshot<Vec<u8>>> {
    let mut snapshot = MediaSnapshot::default();

    let mut voice: Vec<&MediaFile> = files.iter().filter(|f| f.kind == MediaKind::Audio).collect();
    voice.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.file_name.cmp(&a.file_name)));

    for file in files {
        match file.kind {
            MediaKind::Image => snapshot.images.push(load_artifact(file)?),
            MediaKind::Video => snapshot.videos.push(load_artifact(file)?),
            MediaKind::Audio => {}
        }
    }
    for file in voice {
        snapshot.voice_notes.push(load_artifact(file)?);
    }
    Ok(snapshot)
}
