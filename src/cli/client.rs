//! HTTP client commands against a running server

use crate::api::tasks::{InvokeRequest, InvokeResponse};
use crate::api::ApiResponse;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use vigil_core::{Task, TaskSummary};

async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let envelope: ApiResponse<T> = response
        .json()
        .await
        .with_context(|| format!("Unreadable server response ({})", status))?;
    match (envelope.success, envelope.data) {
        (true, Some(data)) => Ok(data),
        _ => bail!(
            "{} ({})",
            envelope.error.unwrap_or_else(|| "request failed".to_string()),
            status
        ),
    }
}

fn base(server: &str) -> &str {
    server.trim_end_matches('/')
}

/// Submit a goal and print the new task id
pub async fn submit(server: &str, goal: &str, context: Option<&str>) -> Result<()> {
    let context = context
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--context must be valid JSON")?;

    let response = reqwest::Client::new()
        .post(format!("{}/invoke", base(server)))
        .json(&InvokeRequest {
            goal: goal.to_string(),
            context,
        })
        .send()
        .await
        .with_context(|| format!("Could not reach {}", server))?;
    let accepted: InvokeResponse = read(response).await?;

    println!("Task submitted: {}", accepted.task_id);
    println!("Status:         {}", accepted.status);
    println!("Follow with:    vigil status {}", accepted.task_id);
    Ok(())
}

/// Print one task
pub async fn status(server: &str, task_id: &str) -> Result<()> {
    let response = reqwest::get(format!("{}/task/{}/status", base(server), task_id))
        .await
        .with_context(|| format!("Could not reach {}", server))?;
    let task: Task = read(response).await?;

    println!("Task:   {}", task.id);
    println!("Goal:   {}", task.goal);
    println!("Status: {}", task.status);
    if let Some(reason) = &task.pause_reason {
        println!("Reason: {}", reason);
    }
    if !task.plan.is_empty() {
        println!("Plan:");
        for (i, step) in task.plan.iter().enumerate() {
            let marker = if i < task.current_step_index { "x" } else { " " };
            println!("  [{}] {}. {}", marker, i + 1, step);
        }
    }
    Ok(())
}

/// Print every task, most recent first
pub async fn list(server: &str) -> Result<()> {
    let response = reqwest::get(format!("{}/tasks/list", base(server)))
        .await
        .with_context(|| format!("Could not reach {}", server))?;
    let tasks: Vec<TaskSummary> = read(response).await?;

    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    for t in tasks {
        println!(
            "{}  {:<17} {}/{}  {}",
            t.id,
            t.status.as_str(),
            t.current_step_index,
            t.plan_len,
            t.goal
        );
    }
    Ok(())
}
