//! The fixed verification deck.

pub struct Question {
    /// Locale key of the question text.
    pub key: &'static str,
    /// Option labels are proper names and stay untranslated.
    pub options: [&'static str; 3],
    pub answer: usize,
}

pub const DECK: [Question; 3] = [
    Question {
        key: "quiz.question_1",
        options: ["USOS", "EDUPL", "MUCI"],
        answer: 0,
    },
    Question {
        key: "quiz.question_2",
        options: ["Gmail", "Outlook", "Yahoo"],
        answer: 1,
    },
    Question {
        key: "quiz.question_3",
        options: ["Ul. Niepodległości", "Ul. Chińska", "Ul. Róż"],
        answer: 0,
    },
];

pub fn is_correct(question: usize, choice: usize) -> bool {
    DECK.get(question).is_some_and(|q| q.answer == choice)
}

pub fn is_last(question: usize) -> bool {
    question + 1 >= DECK.len()
}

pub fn passed(correct: u32, threshold: u32) -> bool {
    correct >= threshold
}
