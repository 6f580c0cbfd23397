#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::chat::{ChatError, ChatMessage, ResearchChat, build_prompt};
    use crate::config::RetrievalConfig;
    use crate::llm::scripted::{HashingEmbedder, ScriptedBackend};
    use crate::retrieval::Retriever;
    use crate::store::{MemoryStore, Store};
    use crate::types::{AgentName, Document, Project};

    async fn setup() -> (Arc<MemoryStore>, Arc<Retriever>, Project) {
        let store = Arc::new(MemoryStore::new());
        let project = store
            .create_project(Project::new("Sleep", ""))
            .await
            .unwrap();
        let retriever = Arc::new(Retriever::new(
            Arc::new(HashingEmbedder::default()),
            RetrievalConfig::default(),
            2,
        ));
        (store, retriever, project)
    }

    #[tokio::test]
    async fn test_answer_uses_retrieved_sources() {
        let (store, retriever, project) = setup().await;
        let document = Document::new(&project.id, "sleep.txt", "slow wave sleep consolidates memory");
        retriever.index(&project.id, &[document]).await.unwrap();

        let backend = Arc::new(ScriptedBackend::new().otherwise("Sleep helps memory [Source 1]."));
        let chat = ResearchChat::new(backend.clone(), retriever, store);

        let answer = chat
            .ask(&project.id, "how does slow wave sleep consolidate memory", &[])
            .await
            .unwrap();

        assert_eq!(answer.answer, "Sleep helps memory [Source 1].");
        assert_eq!(answer.sources.len(), 1);
        assert!(!answer.used_run_outputs);
        let prompt = &backend.prompts()[0];
        assert!(prompt.contains("[Source 1]: slow wave sleep consolidates memory"));
        assert!(!prompt.contains("Previous conversation"));
    }

    #[tokio::test]
    async fn test_context_size_follows_configured_top_k() {
        let store = Arc::new(MemoryStore::new());
        let project = store.create_project(Project::new("Sleep", "")).await.unwrap();
        let documents: Vec<Document> = (0..5)
            .map(|i| {
                Document::new(
                    &project.id,
                    format!("sleep{}.txt", i),
                    "slow wave sleep consolidates memory",
                )
            })
            .collect();

        let mut answers = Vec::new();
        for config in [
            RetrievalConfig::default(),
            RetrievalConfig {
                top_k: 5,
                ..Default::default()
            },
        ] {
            let retriever = Arc::new(Retriever::new(
                Arc::new(HashingEmbedder::default()),
                config,
                2,
            ));
            retriever.index(&project.id, &documents).await.unwrap();
            let backend = Arc::new(ScriptedBackend::new().otherwise("ok"));
            let chat = ResearchChat::new(backend.clone(), retriever, store.clone());
            let answer = chat
                .ask(&project.id, "how does slow wave sleep consolidate memory", &[])
                .await
                .unwrap();
            assert_eq!(
                backend.prompts()[0].matches("[Source ").count(),
                answer.sources.len()
            );
            answers.push(answer);
        }

        assert_eq!(answers[0].sources.len(), 3);
        assert_eq!(answers[1].sources.len(), 5);
    }

    #[tokio::test]
    async fn test_falls_back_to_latest_run_outputs() {
        let (store, retriever, project) = setup().await;
        let run = store
            .create_agent_run(&project.id, AgentName::Summarizer)
            .await
            .unwrap();
        store
            .complete_agent_run(&project.id, &run.id, r#"{"overall":"Sleep matters"}"#.to_string())
            .await
            .unwrap();

        let backend = Arc::new(ScriptedBackend::new().otherwise("From the summary."));
        let chat = ResearchChat::new(backend.clone(), retriever, store);

        let answer = chat.ask(&project.id, "what matters?", &[]).await.unwrap();

        assert!(answer.used_run_outputs);
        assert!(answer.sources.is_empty());
        assert!(backend.prompts()[0].contains(r#"[summarizer]: {"overall":"Sleep matters"}"#));
    }

    #[tokio::test]
    async fn test_rejects_blank_question_and_unknown_project() {
        let (store, retriever, _project) = setup().await;
        let chat = ResearchChat::new(Arc::new(ScriptedBackend::new()), retriever, store);

        assert!(matches!(
            chat.ask("any", "  ", &[]).await,
            Err(ChatError::EmptyQuestion)
        ));
        assert!(matches!(
            chat.ask("missing", "q", &[]).await,
            Err(ChatError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn test_prompt_keeps_last_four_messages() {
        let history: Vec<ChatMessage> = (1..=6)
            .map(|i| {
                if i % 2 == 1 {
                    ChatMessage::user(format!("q{}", i))
                } else {
                    ChatMessage::assistant(format!("a{}", i))
                }
            })
            .collect();

        let prompt = build_prompt("ctx", &history, "next?");

        assert!(!prompt.contains("q1"));
        assert!(!prompt.contains("a2"));
        assert!(prompt.contains("Previous conversation:\nUser: q3\nAssistant: a4\nUser: q5\nAssistant: a6"));
        assert!(prompt.contains("User question: next?"));
    }
}
