//! Instruction text sent to the completion service.
//!
//! Both builders are pure functions of their inputs: no randomness and no
//! timestamps, so the exact prompt for a given sentence pair is stable across
//! calls and can be asserted in tests.

/// Evaluation instruction for one Korean sentence and the user's English
/// translation. The output schema requested here is what
/// [`crate::client::parse_feedback`] expects back.
pub fn evaluation_prompt(korean: &str, user_answer: &str) -> String {
    format!(
        r#"[Role]
You are an English teacher specializing in Korean students at the A2-B1 level. Your name is "Tutor". Your goal is feedback that is encouraging, easy to understand, and helps the user learn. Always keep a friendly, supportive, positive tone.

[Task]
You are given a Korean sentence and a user's English translation of it. Evaluate the translation and provide constructive feedback.

[Input]

Korean Sentence: {korean}

User's Translation: {user_answer}

[Output format]
Produce the output as JSON with exactly this structure:
{{
  "score": <integer>,
  "corrected_sentence": "<string>",
  "feedback_summary": "<string>",
  "detailed_feedback": [
    {{
      "type": "<string: 'Praise' or 'Suggestion'>",
      "original": "<string: part of the user's sentence>",
      "comment": "<string>"
    }}
  ]
}}

[Field guidance]

score:
- Evaluate grammar, vocabulary, and naturalness, out of 100.
- If the meaning is conveyed, score generously even when there are small mistakes.

corrected_sentence:
- Mandatory. Revise the user's sentence so it is grammatically correct and natural, keeping the user's original intent and vocabulary as much as possible.
- If the user's sentence is completely incorrect or nonsensical, provide the correct translation instead.

feedback_summary:
- One friendly, encouraging sentence in Korean summarizing the feedback.

detailed_feedback:
- Specific feedback on the user's sentence.
- type: "Praise" for parts done well, "Suggestion" for parts to improve.
- original: the exact word or phrase from the user's sentence the feedback is about.
- comment: a short, simple explanation in Korean suitable for A2-B1 learners. Avoid technical grammar terms.

[Example]

Input:
Korean Sentence: "나는 어제 공원에서 친구를 만났어."
User's Translation: "I meeted my friend at park yesterday."

Expected output (JSON):
{{
  "score": 85,
  "corrected_sentence": "I met my friend at the park yesterday.",
  "feedback_summary": "정말 잘했어요! 동사의 과거형과 장소 표현만 살짝 다듬으면 완벽해요.",
  "detailed_feedback": [
    {{
      "type": "Suggestion",
      "original": "meeted",
      "comment": "'meet'의 과거형은 'met'이에요. 불규칙 동사라서 헷갈릴 수 있지만 꼭 기억해 주세요!"
    }},
    {{
      "type": "Praise",
      "original": "yesterday",
      "comment": "'어제'라는 시간 표현을 문장 끝에 정확하게 잘 써주셨어요."
    }}
  ]
}}
"#
    )
}

/// Translation-only instruction for one English sentence. Proper nouns must
/// survive untranslated, so the rules call them out explicitly.
pub fn translation_prompt(english: &str) -> String {
    format!(
        r#"### Instruction ###
Translate the following English sentence into Korean. Only provide the Korean translation, nothing else. No explanations, no extra text.

### Rules ###
1. Do not translate proper nouns (names of people, places, companies, products). Keep them in their original English text.
2. In general, words that start with a capital letter in the middle of a sentence are proper nouns.
3. If the first word of the sentence is a name (like 'Apple' or 'Gemini'), it is also a proper noun and should not be translated.

### Examples ###
- Source Sentence: Gemini was developed by Google in California.
- Correct Translation: Gemini는 California에 있는 Google에서 개발했다.

- Source Sentence: Apple announced its new iPhone in Cupertino.
- Correct Translation: Apple은 Cupertino에서 새로운 iPhone을 발표했다.

### Sentence to Translate ###
{english}
"#
    )
}
