// Prompt template module
// Fixed instruction template binding retrieved context to a user question


/// Instruction template for the recommendation prompt.
///
/// The output contract (exactly three titles, short summaries, match
/// rationale, numbered list, honest "don't know") is requested here and
/// only here; nothing downstream enforces the shape of the model's reply.
const RECOMMENDATION_TEMPLATE: &str = "\
You are an expert anime recommender. Your job is to help users find the \
perfect anime based on their preferences.

Using the following context, provide a detailed and engaging response to \
the user's question.

For each question, suggest exactly three anime titles. For each \
recommendation, include:
1. The anime title.
2. A concise plot summary (2-3 sentences).
3. A clear explanation of why this anime matches the user's preferences.

Present your recommendations in a numbered list for easy reading.

If you don't know the answer, say so honestly. Do not fabricate any \
information.

Context:
{context}

User's question:
{question}

Your well-structured response:
";

/// Render the recommendation prompt. Pure and deterministic: identical
/// inputs always produce byte-identical output.
#[inline]
pub fn render_prompt(context: &str, question: &str) -> String {
    RECOMMENDATION_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}
