//! The turn driver: dispatch nodes until one returns `End`, persisting
//! the snapshot after every node so a crash at any point resumes from
//! the last completed transition.

use wd_domain::error::Result;
use wd_domain::graph::GraphState;
use wd_domain::message::ChatMessage;
use wd_domain::trace::TraceEvent;
use wd_store::StateStore;

use crate::nodes::{self, Next, NodeCtx, NodeId};

pub(crate) async fn drive_turn(
    ctx: &NodeCtx<'_>,
    states: &StateStore,
    state: &mut GraphState,
) -> Result<()> {
    let mut node = NodeId::Router;
    let mut visited: u32 = 0;

    loop {
        visited += 1;
        if visited > ctx.config.runtime.max_node_steps {
            tracing::error!(
                thread_id = %state.thread_id,
                limit = ctx.config.runtime.max_node_steps,
                "node dispatch limit reached; terminating turn"
            );
            state.messages.push(ChatMessage::assistant(
                "The task was stopped because it exceeded the processing limit.",
            ));
            break;
        }

        TraceEvent::NodeEntered {
            thread_id: state.thread_id.clone(),
            node: node.to_string(),
            step: state.current_step,
        }
        .emit();

        let next = nodes::dispatch(node, ctx, state).await?;
        states.save(state)?;

        match next {
            Next::End => break,
            Next::Node(n) => node = n,
        }
    }

    TraceEvent::TurnFinished {
        thread_id: state.thread_id.clone(),
        nodes_visited: visited,
        awaiting_approval: state.awaiting_approval,
    }
    .emit();
    Ok(())
}
