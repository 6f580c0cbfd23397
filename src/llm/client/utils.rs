use std::future::Future;
use std::time::Duration;

use crate::config::LLMConfig;

/// 高能效模型可处理的prompt长度上限（字节）
const EFFICIENT_PROMPT_LIMIT: usize = 32 * 1024;

/// 按prompt长度选择模型，返回（首选模型，备选模型）
pub fn evaluate_befitting_model(
    llm_config: &LLMConfig,
    system_prompt: &str,
    user_prompt: &str,
) -> (String, Option<String>) {
    if system_prompt.len() + user_prompt.len() <= EFFICIENT_PROMPT_LIMIT
        && llm_config.model_efficient != llm_config.model_powerful
    {
        return (
            llm_config.model_efficient.clone(),
            Some(llm_config.model_powerful.clone()),
        );
    }
    (llm_config.model_powerful.clone(), None)
}

/// 通用重试逻辑，第N次失败后等待 N * retry_delay_ms 再重试
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_attempts: u32,
    retry_delay_ms: u64,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                attempt += 1;
                tracing::warn!(
                    "❌ 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                    attempt,
                    max_attempts,
                    err
                );
                if attempt >= max_attempts {
                    return Err(err);
                }
                let delay = retry_delay_ms.saturating_mul(attempt as u64);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}
