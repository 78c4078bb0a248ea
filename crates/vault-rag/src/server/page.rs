//! Single-page upload and question form

use axum::response::Html;

/// GET / - The upload and question page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>VaultAI: Document Q&amp;A</title>
<style>
  body { font-family: system-ui, sans-serif; margin: 0; display: flex; min-height: 100vh; }
  aside { width: 300px; padding: 1.5rem; background: #f3f4f6; }
  main { flex: 1; padding: 1.5rem 2.5rem; max-width: 900px; }
  button { margin-top: .75rem; padding: .5rem 1rem; cursor: pointer; }
  input[type=text] { width: 100%; padding: .6rem; font-size: 1rem; box-sizing: border-box; }
  .notice { margin-top: 1rem; padding: .75rem; border-radius: 6px; }
  .success { background: #dcfce7; }
  .warning { background: #fef9c3; }
  .error { background: #fee2e2; }
  .answer { white-space: pre-wrap; margin-top: 1rem; }
  details { margin-top: 1rem; }
  .source { border-left: 3px solid #9ca3af; padding-left: .75rem; margin: .75rem 0; white-space: pre-wrap; }
  mark { background: #fde68a; }
</style>
</head>
<body>
<aside>
  <h2>Document Upload</h2>
  <form id="upload-form">
    <input id="files" type="file" accept="application/pdf,.pdf" multiple>
    <br>
    <button type="submit">Build Brain</button>
  </form>
  <div id="upload-status"></div>
</aside>
<main>
  <h1>VaultAI: Internal Document Q&amp;A</h1>
  <form id="ask-form">
    <input id="question" type="text" placeholder="Ask a question about your documents" autocomplete="off">
    <button type="submit">Ask</button>
  </form>
  <div id="result"></div>
</main>
<script>
function escapeHtml(text) {
  return text.replace(/&/g, "&amp;").replace(/</g, "&lt;").replace(/>/g, "&gt;");
}

function withMarks(text) {
  return escapeHtml(text).replace(/&lt;mark&gt;/g, "<mark>").replace(/&lt;\/mark&gt;/g, "</mark>");
}

function notice(kind, text) {
  return '<div class="notice ' + kind + '">' + escapeHtml(text) + '</div>';
}

async function errorText(response) {
  try {
    const body = await response.json();
    return body.error ? body.error.message : response.statusText;
  } catch (_) {
    return response.statusText;
  }
}

document.getElementById("upload-form").addEventListener("submit", async (event) => {
  event.preventDefault();
  const status = document.getElementById("upload-status");
  const files = document.getElementById("files").files;
  if (files.length === 0) {
    status.innerHTML = notice("warning", "Choose at least one PDF.");
    return;
  }
  const form = new FormData();
  for (const file of files) form.append("files", file, file.name);
  status.innerHTML = notice("warning", "Processing documents...");

  const response = await fetch("/api/ingest", { method: "POST", body: form });
  if (!response.ok) {
    status.innerHTML = notice("error", await errorText(response));
    return;
  }
  const report = await response.json();
  let html = notice(report.knowledge_base_updated ? "success" : "error", report.message);
  for (const failure of report.failed) {
    html += notice("error", failure.source_name + ": " + failure.message);
  }
  for (const name of report.skipped) {
    html += notice("warning", name + ": duplicate, skipped");
  }
  status.innerHTML = html;
});

document.getElementById("ask-form").addEventListener("submit", async (event) => {
  event.preventDefault();
  const result = document.getElementById("result");
  const question = document.getElementById("question").value;
  if (!question.trim()) return;
  result.innerHTML = notice("warning", "Thinking...");

  const response = await fetch("/api/ask", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ question }),
  });
  if (!response.ok) {
    result.innerHTML = notice("error", await errorText(response));
    return;
  }
  const outcome = await response.json();
  if (outcome.status === "no_knowledge_base") {
    result.innerHTML = notice("warning", outcome.warning);
    return;
  }
  let html = '<h3>Answer</h3><div class="answer">' + escapeHtml(outcome.answer) + '</div>';
  html += '<details><summary>View Sources</summary>';
  for (const source of outcome.sources) {
    html += '<div class="source"><strong>' + escapeHtml(source.source_name) +
      ' (Page ' + source.page_number + ')</strong><br>' + withMarks(source.text_highlighted) + '</div>';
  }
  html += '</details>';
  result.innerHTML = html;
});
</script>
</body>
</html>
"#;
