use crate::llm::{ChatMessage, Role};
use crate::records::Document;

/// Fixed sentence the model must use when the context has nothing relevant.
pub const NO_SOLUTION_PHRASE: &str =
    "No solution could be found based on the available maintenance data.";

/// Separator placed between retrieved documents.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Heading that opens the context section of the user message.
pub const CONTEXT_HEADING: &str = "Context from past work orders:\n";

const EMPTY_HISTORY: &str = "(no previous messages in this conversation)";
const EMPTY_CONTEXT: &str = "(no maintenance records were retrieved for this query)";

/// Role-labelled transcript, oldest turn first.
pub fn render_history(history: &[ChatMessage]) -> String {
    if history.is_empty() {
        return EMPTY_HISTORY.to_string();
    }

    history
        .iter()
        .map(|message| {
            let label = match message.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
                Role::System => "System",
            };
            format!("{}: {}", label, message.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn join_context(documents: &[Document]) -> String {
    if documents.is_empty() {
        return EMPTY_CONTEXT.to_string();
    }

    documents
        .iter()
        .map(|doc| doc.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

pub fn system_instructions() -> String {
    format!(
        "You are a senior maintenance technician with long experience repairing \
fitness and industrial equipment. You answer questions from other technicians \
using only the maintenance history supplied with each question.\n\
\n\
Constraints:\n\
- Never invent causes or solutions that do not appear in the supplied context.\n\
- If the context holds nothing relevant to the equipment and fault, answer exactly: \"{}\"\n\
- Be technical and concise.\n\
\n\
You may:\n\
- Infer probable causes, solutions and time estimates from analogous past cases in the context.\n\
\n\
You must:\n\
- State that your suggestions are based on maintenance history and do not replace an on-site diagnosis.",
        NO_SOLUTION_PHRASE
    )
}

/// Variables for one question. The context section comes last.
pub fn user_prompt(
    question: &str,
    equipment: &str,
    documents: &[Document],
    history: &[ChatMessage],
) -> String {
    format!(
        "Equipment: {}\n\nConversation so far:\n{}\n\nQuestion: {}\n\n{}{}",
        equipment.trim(),
        render_history(history),
        question.trim(),
        CONTEXT_HEADING,
        join_context(documents)
    )
}

pub fn build_messages(
    question: &str,
    equipment: &str,
    documents: &[Document],
    history: &[ChatMessage],
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_instructions()),
        ChatMessage::user(user_prompt(question, equipment, documents, history)),
    ]
}
