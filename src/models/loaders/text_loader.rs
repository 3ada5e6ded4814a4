use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;

use crate::models::question::{DocumentInput, TextBlock};

/// 从纯文本文件装载文档（一行一个文本块）
///
/// 这是唯一内置的阅读器；表格、Word、PDF 等容器格式由外部
/// 阅读器转换成同样的文本块序列后送入流水线。
pub async fn load_text_document(path: &Path) -> Result<DocumentInput> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取文本文件: {}", path.display()))?;

    let source_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let blocks = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| TextBlock::new(line, i + 1))
        .collect();

    Ok(DocumentInput { source_id, blocks })
}

/// 从文件夹中装载所有纯文本文档
///
/// 单个文件装载失败只记录警告并跳过，不影响其余文件。
pub async fn load_all_text_files(folder_path: &str) -> Result<Vec<DocumentInput>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut documents = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("txt") {
            tracing::info!(
                "正在装载: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );

            match load_text_document(&path).await {
                Ok(document) => {
                    tracing::info!("成功装载 {} 个文本块", document.blocks.len());
                    documents.push(document);
                }
                Err(e) => {
                    tracing::warn!("装载文件失败 {}: {}", path.display(), e);
                }
            }
        }
    }

    // 文件系统遍历顺序不稳定，按标识排序保证批处理可复现
    documents.sort_by(|a, b| a.source_id.cmp(&b.source_id));
    Ok(documents)
}
