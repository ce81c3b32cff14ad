#![allow(dead_code)]

use futures::channel::mpsc;
use kaiwa_core::{KaiwaError, LlmClient, Message, ResponseRequest, Result, StreamEvent};
use std::sync::Mutex;

/// In-memory completion collaborator with canned replies.
pub struct ScriptedClient {
    title: std::result::Result<String, String>,
    reply: std::result::Result<Vec<String>, String>,
    truncated: bool,
    pub requests: Mutex<Vec<ResponseRequest>>,
    pub chats: Mutex<Vec<(String, Vec<Message>)>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            title: Ok("Greeting".to_string()),
            reply: Ok(vec!["Hello".to_string(), ", world".to_string()]),
            truncated: false,
            requests: Mutex::new(Vec::new()),
            chats: Mutex::new(Vec::new()),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Ok(title.to_string());
        self
    }

    pub fn with_failing_title(mut self, reason: &str) -> Self {
        self.title = Err(reason.to_string());
        self
    }

    pub fn with_reply(mut self, fragments: &[&str]) -> Self {
        self.reply = Ok(fragments.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Stream the fragments, then close without a terminal event.
    pub fn with_truncated_reply(mut self, fragments: &[&str]) -> Self {
        self.reply = Ok(fragments.iter().map(|s| s.to_string()).collect());
        self.truncated = true;
        self
    }

    pub fn with_failing_reply(mut self, reason: &str) -> Self {
        self.reply = Err(reason.to_string());
        self
    }

    pub fn last_request(&self) -> ResponseRequest {
        self.requests.lock().unwrap().last().cloned().expect("no request sent")
    }

    pub fn chat_count(&self) -> usize {
        self.chats.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    async fn respond(&self, request: &ResponseRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Ok(fragments) => Ok(fragments.concat()),
            Err(e) => Err(KaiwaError::Completion(e.clone())),
        }
    }

    async fn respond_stream(
        &self,
        request: &ResponseRequest,
    ) -> Result<mpsc::UnboundedReceiver<StreamEvent>> {
        self.requests.lock().unwrap().push(request.clone());
        let (tx, rx) = mpsc::unbounded();
        match &self.reply {
            Ok(fragments) => {
                for fragment in fragments {
                    tx.unbounded_send(StreamEvent::TextDelta(fragment.clone())).unwrap();
                }
                if !self.truncated {
                    tx.unbounded_send(StreamEvent::Done).unwrap();
                }
            }
            Err(e) => {
                tx.unbounded_send(StreamEvent::TextDelta("partial".into())).unwrap();
                tx.unbounded_send(StreamEvent::Error(e.clone())).unwrap();
            }
        }
        Ok(rx)
    }

    async fn chat(&self, model: &str, messages: &[Message]) -> Result<String> {
        self.chats
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));
        match &self.title {
            Ok(t) => Ok(t.clone()),
            Err(e) => Err(KaiwaError::Completion(e.clone())),
        }
    }
}
