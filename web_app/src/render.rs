//! HTML for both front-ends. Interpolated text goes through `html_escape`.

use classifier::{PipelineOutput, Prediction};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;

const STYLE: &str = "body{font-family:sans-serif;max-width:720px;margin:2rem auto;padding:0 1rem}\
.error{color:#b00020;border:1px solid #b00020;padding:.75rem;border-radius:4px}\
img{max-width:100%;border-radius:4px}";

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        encode_text(title),
        STYLE,
        body
    )
}

fn upload_form() -> &'static str {
    "<form id=\"upload\" action=\"/predict\" method=\"post\" enctype=\"multipart/form-data\">\n\
     <label for=\"file\">Upload an image</label>\n\
     <input type=\"file\" id=\"file\" name=\"file\" accept=\"image/*\">\n\
     <button type=\"submit\">Predict</button>\n\
     </form>"
}

fn error_block(message: &str) -> String {
    format!("<div class=\"error\" role=\"alert\">{}</div>", encode_text(message))
}

pub fn format_confidence(confidence: f32) -> String {
    format!("{:.2}", confidence)
}

/// Prediction text plus the ranked alternatives, wrapped in the prediction section.
fn prediction_section(prediction: &Prediction) -> String {
    let mut section = String::from("<section id=\"prediction\">\n");
    let _ = writeln!(
        section,
        "<p class=\"label\"><strong>{}</strong> (confidence {})</p>",
        encode_text(&prediction.best.label),
        format_confidence(prediction.best.confidence)
    );
    if prediction.top_k.len() > 1 {
        section.push_str("<ol class=\"top-k\">\n");
        for scored in &prediction.top_k {
            let _ = writeln!(
                section,
                "<li>{}: {}</li>",
                encode_text(&scored.label),
                format_confidence(scored.confidence)
            );
        }
        section.push_str("</ol>\n");
    }
    section.push_str("</section>");
    section
}

fn preview_img(output: &PipelineOutput) -> String {
    format!(
        "<img id=\"preview\" src=\"data:image/jpeg;base64,{}\" width=\"{}\" height=\"{}\" alt=\"uploaded image\">",
        encode_double_quoted_attribute(&output.preview_jpeg_base64),
        output.preview_width,
        output.preview_height
    )
}

pub fn home_page() -> String {
    page(
        "Image Classifier",
        &format!("<h1>Image Classifier</h1>\n{}", upload_form()),
    )
}

pub fn result_page(output: &PipelineOutput) -> String {
    page(
        "Prediction",
        &format!(
            "<h1>Prediction</h1>\n{}\n{}\n<p><a href=\"/\">Classify another image</a></p>",
            preview_img(output),
            prediction_section(&output.prediction)
        ),
    )
}

pub fn error_page(message: &str) -> String {
    page(
        "Prediction failed",
        &format!(
            "<h1>Prediction failed</h1>\n{}\n{}",
            error_block(message),
            upload_form()
        ),
    )
}

const DASHBOARD_SCRIPT: &str = r#"<script>
document.getElementById("file").addEventListener("change", async (event) => {
  const result = document.getElementById("result");
  const file = event.target.files[0];
  if (!file) { result.innerHTML = ""; return; }
  const body = new FormData();
  body.append("file", file);
  result.innerHTML = "<p>Running prediction...</p>";
  try {
    const response = await fetch("/upload", { method: "POST", body });
    result.innerHTML = await response.text();
  } catch (err) {
    result.innerHTML = '<div class="error" role="alert">Upload failed</div>';
  }
});
</script>"#;

pub fn dashboard_page(title: &str) -> String {
    page(
        title,
        &format!(
            "<h1>{}</h1>\n\
             <p>The image you upload is fed to a deep neural network in real time.</p>\n\
             <label for=\"file\">Upload an image</label>\n\
             <input type=\"file\" id=\"file\" name=\"file\" accept=\"image/*\">\n\
             <div id=\"result\"></div>\n{}",
            encode_text(title),
            DASHBOARD_SCRIPT
        ),
    )
}

pub fn dashboard_result(output: &PipelineOutput) -> String {
    format!(
        "<h2>Here is the image you uploaded</h2>\n{}\n<h2>Prediction:</h2>\n{}",
        preview_img(output),
        prediction_section(&output.prediction)
    )
}

pub fn dashboard_error(message: &str) -> String {
    error_block(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use classifier::ScoredLabel;

    fn output() -> PipelineOutput {
        let best = ScoredLabel {
            class_id: 0,
            label: "<pizza>".to_string(),
            confidence: 0.987,
        };
        PipelineOutput {
            prediction: Prediction {
                top_k: vec![
                    best.clone(),
                    ScoredLabel {
                        class_id: 1,
                        label: "bread".to_string(),
                        confidence: 0.013,
                    },
                ],
                best,
            },
            preview_jpeg_base64: "AAAA".to_string(),
            preview_width: 340,
            preview_height: 340,
        }
    }

    #[test]
    fn test_home_page_has_form_and_no_prediction() {
        let html = home_page();
        assert!(html.contains("enctype=\"multipart/form-data\""));
        assert!(html.contains("name=\"file\""));
        assert!(!html.contains("id=\"prediction\""));
    }

    #[test]
    fn test_result_page_escapes_labels() {
        let html = result_page(&output());
        assert!(html.contains("&lt;pizza&gt;"));
        assert!(!html.contains("<pizza>"));
        assert!(html.contains("0.99"));
        assert!(html.contains("bread: 0.01"));
        assert!(html.contains("data:image/jpeg;base64,AAAA"));
    }

    #[test]
    fn test_dashboard_fragment() {
        let html = dashboard_result(&output());
        assert!(html.contains("Here is the image you uploaded"));
        assert!(html.contains("width=\"340\" height=\"340\""));
        assert!(html.contains("id=\"prediction\""));
    }

    #[test]
    fn test_error_messages_are_escaped() {
        let html = dashboard_error("bad <script>alert(1)</script> & more");
        assert!(html.contains("bad &lt;script&gt;alert(1)&lt;/script&gt; &amp; more"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_dashboard_page_escapes_title() {
        let html = dashboard_page("Pizza & Co");
        assert!(html.contains("<h1>Pizza &amp; Co</h1>"));
        assert!(html.contains("fetch(\"/upload\""));
        assert!(!html.contains("id=\"prediction\""));
    }
}
