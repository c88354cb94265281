//! Prompts for the structuring LLM and the vision OCR engine.
//!
//! Every prompt lives here so a wording change touches exactly one file and
//! tests can assert on the literal text without calling a model.
//!
//! Callers can override the structuring prompt via
//! [`crate::config::ServiceConfig::system_prompt`]; the constants here are used
//! only when no override is provided.

/// Literal prefix of the structuring user message.
pub const STRUCTURING_USER_PREAMBLE: &str =
    "Extract structured JSON data from the following OCR text:";

/// Default system prompt for structuring an invoice transcript.
///
/// Carries a worked example of the target JSON shape; the model is expected to
/// mirror its keys and nesting.
pub const DEFAULT_STRUCTURING_PROMPT: &str = r#"You are an AI that extracts structured fields from invoices or logistics documents.
Format the output like this JSON example:
{
  "Company Name": "KWE Kintetsu World Express (Taiwan), Inc.",
  "Company Address": {
    "Address 1": "3FL.NO.99.SEC.2.CHANG. AN El ROAD",
    "Address 2": "ROOM 3,9TH FL.NO.412.CHUNG-SHANG",
    "City": "TAIPEI",
    "Postal Code": "104",
    "Country": "TAIWAN"
  },
  "Second Address": "2ND RD.KAOHSIUNG 802,TAIWAN",
  "Telephone Numbers": ["(02)2506-3151", "(07)332-0907", "(07)332-0037"],
  "Fax Numbers": ["(02)2506-5735", "(07)332-0913"],
  "Invoice Type": "TAX INVOICE",
  "Page Number": "1/1",
  "Invoice Category": "AIR IMPORT",
  "GST Registration Number": "",
  "Bill To": "STRYKER FAR EAST INC. TAIWAN BRANCH (EDI BILL' TO ONLY)",
  "Invoice Number": "59302142414300",
  "Bill To Address": "5F, 1 NO. 100, SEC. 2, ROOSEVELT RD, TAIPEI 10084",
  "Invoice Date": "11-12-24",
  "Reference Number": "302264514",
  "Payment Terms": "30 NET",
  "Master Airway Bill Number": "297-60287673",
  "House Airway Bill Number": "330014937785",
  "Flight Number and Date": "CI 5231 / Nov.18, 2024",
  "Pieces": 5,
  "Weight": 1379.0,
  "Origin/Destination": "ORD/ TPE",
  "Description and Remarks": "MEDICAL SPARE PARTS",
  "Charges": {
    "Delivery Charge": 8511.00,
    "Heavy Lift Surcharge": 552.00,
    "Duty & Tax": 38249.00,
    "Handling": 945.00,
    "Customs Entry Fee (Formal)": 1260.00,
    "Terminal Service Fee Destination": 13439.00,
    "Airfreight-Inbound": 63842.00,
    "GST Output Tax": 1235.00,
    "Standard Rated Amount": 24707.00,
    "Zero Rated Amount": 102091.00
  },
  "Total Amount": 128033.00,
  "Payment Method": "Cross Cheque payable to Kinetsul Express (Taiwan), Inc. within Credit Term",
  "Invoice Requirement": "This Computer Generated Invoice Requires No Signature",
  "Invoice Status": "ORIGINAL INVOICE",
  "Errors and Omissions Excepted": "E.& O.E."
}"#;

/// System prompt for the vision OCR engine: plain transcription, no markup.
///
/// Blank lines between text blocks are significant; the reply parser uses
/// them as block boundaries.
pub const TRANSCRIPTION_PROMPT: &str = r#"You are an OCR engine. Transcribe every piece of text visible on this document page.

Rules:
1. Output one physical line of text per output line, in reading order (top to bottom, left to right).
2. Separate visually distinct text blocks (paragraphs, address boxes, table rows groups, columns) with one empty line.
3. Copy characters exactly as printed, including numbers, punctuation and currency symbols. Do not correct spelling.
4. Do not use Markdown, code fences, bullet markers or table syntax.
5. Do not add commentary, headings or explanations.
6. If the page contains no text, output nothing."#;

/// Build the structuring user message for a transcript.
pub fn structuring_user_message(transcript: &str) -> String {
    format!("{STRUCTURING_USER_PREAMBLE}\n\n{transcript}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_starts_with_preamble() {
        let msg = structuring_user_message("INVOICE 42\n");
        assert!(msg.starts_with(STRUCTURING_USER_PREAMBLE));
        assert_eq!(
            msg,
            "Extract structured JSON data from the following OCR text:\n\nINVOICE 42\n"
        );
    }

    #[test]
    fn user_message_with_empty_transcript() {
        let msg = structuring_user_message("");
        assert_eq!(msg, format!("{STRUCTURING_USER_PREAMBLE}\n\n"));
    }

    #[test]
    fn example_schema_is_valid_json() {
        let start = DEFAULT_STRUCTURING_PROMPT.find('{').unwrap();
        let example: serde_json::Value =
            serde_json::from_str(&DEFAULT_STRUCTURING_PROMPT[start..]).unwrap();
        assert!(example["Company Address"].is_object());
        assert!(example["Charges"].is_object());
        assert_eq!(example["Pieces"], 5);
    }
}
