// Resume extraction prompt templates.

pub const EXTRACT_SYSTEM: &str = "\
You are a career and resume data extractor. \
From the given content, extract structured information about the person. \
You MUST respond with valid JSON only. No markdown fences, no explanations. \
Use empty strings or empty arrays for missing fields. Never invent data.";

pub const EXTRACT_PROMPT: &str = r#"Extract the resume below into JSON.

CONTENT:
{raw_text}

OUTPUT SCHEMA (return exactly this structure):
{
  "identity": {"name": "string", "email": "string", "phone": "string", "location": "string",
               "links": ["url string"] | [{"label": "string", "url": "string"}]},
  "summary": "string",
  "experience": [{"title": "string", "company": "string", "dates": "string", "bullets": ["string"]}],
  "education": [{"institution": "string", "degree": "string", "field_of_study": "string", "dates": "string"}],
  "achievements": [{"title": "string", "issuer": "string", "date": "string"}],
  "skills": ["string"],
  "languages": [{"language": "string", "level": "Native | Fluent | Intermediate | Basic"}],
  "additional": [{"title": "string, e.g. Volunteer", "content": ["short bullet string"]}]
}

Keep "dates" as written in the resume (e.g. "2020 - Present"). Do not reformat them."#;
