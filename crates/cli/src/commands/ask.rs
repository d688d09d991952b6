//! `plantline ask` — answer a single question.

use plantline_core::message::ThreadId;

pub async fn run(question: String, thread: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let session = super::session().await?;

    // No thread id means the shared default session thread, so repeated
    // `ask` invocations in one process continue the same conversation.
    let thread_id = ThreadId::from(
        thread
            .as_deref()
            .unwrap_or(&session.config().agent.default_thread_id),
    );

    let controller = session.controller();
    let answer = controller.answer(&thread_id, &question).await?;
    println!("{answer}");

    Ok(())
}
