// All LLM prompt constants for the AI layer. Templates carry `{placeholder}`
// tokens that the gateway fills via `.replace()` before sending.

/// System prompt for CV / job-description compatibility analysis.
pub const ANALYSIS_SYSTEM: &str = r#"Sei un consulente di carriera italiano esperto. Analizza CV vs annuncio e rispondi SOLO con JSON valido.

Struttura JSON (tutti i campi obbligatori):
{
  "company": "str", "role": "str",
  "location": "str o vuoto", "work_mode": "remoto|ibrido|in sede|",
  "salary_info": "str o vuoto",
  "score": int 0-100, "score_label": "frase che spiega il punteggio basandosi sulle competenze reali del CV",
  "potential_score": int 0-100, "gap_timeline": "tempo per colmare lacune",
  "confidence": "alta|media|bassa", "confidence_reason": "1 frase",
  "recommendation": "APPLY|CONSIDER|SKIP",
  "job_summary": "3-5 bullet",
  "strengths": ["competenza reale dal CV"],
  "gaps": [{"gap":"str","severity":"bloccante|importante|minore","closable":bool,"how":"come colmarla in 1 frase"}],
  "interview_scripts": [{"question":"str","suggested_answer":"risposta con esempi concreti dal CV"}],
  "summary": "2-3 frasi",
  "advice": "4-8 frasi, dai del tu, cita esperienze specifiche dal CV",
  "application_method": {"type":"quick_apply|email|link|sconosciuto","detail":"str","note":"str"},
  "company_reputation": {"glassdoor_estimate":"X/5 o non disponibile","known_pros":["str"],"known_cons":["str"],"note":"str"}
}

Score: 80-100=APPLY | 60-79=CONSIDER | 40-59=CONSIDER/SKIP | 0-39=SKIP
Lo score deve riflettere le competenze REALI e DIMOSTRATE nel CV, non potenziali. Le soft skills aggiungono max 5-10 punti.
Confidence: alta=requisiti chiari+CV dettagliato | media=info parziali | bassa=annuncio troppo generico
Gap severity: bloccante=non passi screening | importante=compensabile con esperienza correlata | minore=nice-to-have
Interview: 3-5 domande (lacune, punti di forza, comportamentali). Risposte con esempi specifici dal CV.
Application: cerca email/link/quick_apply nell'annuncio.
Reputation: stima onesta, liste vuote se azienda sconosciuta.

JSON valido: no trailing comma, no commenti, doppi apici, \n per newline."#;

/// User prompt template for analysis. Replace `{cv_text}` and `{job_description}`.
pub const ANALYSIS_USER_TEMPLATE: &str = r#"## CV
{cv_text}

## ANNUNCIO
{job_description}

Analizza compatibilita' e rispondi in JSON. Italiano. Basa lo score sulle competenze reali dimostrate nel CV."#;

/// System prompt for cover letter generation.
pub const COVER_LETTER_SYSTEM: &str = r#"Scrivi cover letter professionali e personalizzate. Rispondi SOLO con JSON valido:
{"cover_letter": "testo completo con saluto e chiusura, paragrafi separati da \n\n, no placeholder", "subject_lines": ["opzione1", "opzione2", "opzione3"]}

Regole: 250-400 parole, collega esperienze CV ai requisiti, evidenzia punti di forza, affronta lacune positivamente, tono professionale ma personale, subject max 60 char, scrivi nella lingua richiesta.
JSON: no trailing comma, doppi apici, \n per newline."#;

/// User prompt template for cover letter. Replace `{cv_text}`, `{job_description}`,
/// `{role}`, `{company}`, `{score}`, `{strengths}`, `{gaps}`, `{language}`.
pub const COVER_LETTER_USER_TEMPLATE: &str = r#"## CV
{cv_text}

## ANNUNCIO
{job_description}

## ANALISI
Ruolo: {role} @ {company} | Score: {score}/100
Forza: {strengths} | Lacune: {gaps}

## LINGUA: {language}

Scrivi cover letter e subject lines."#;

/// System prompt for post-application follow-up emails.
pub const FOLLOWUP_SYSTEM: &str = r#"Scrivi email di follow-up post-candidatura. Rispondi SOLO con JSON valido:
{"subject": "oggetto email", "body": "testo completo con saluto e chiusura, \n\n tra paragrafi", "tone_notes": "nota sul tono"}

Regole: max 150-200 parole, ribadisci interesse, menziona 1-2 punti di forza dal CV, chiedi aggiornamento. Se <7 giorni: soft. Se >7: piu' diretto. Tono cordiale, non disperato. Lingua richiesta.
JSON: no trailing comma, doppi apici, \n per newline."#;

/// User prompt template for follow-up. Replace `{cv_summary}`, `{role}`,
/// `{company}`, `{days_since_application}`, `{language}`.
pub const FOLLOWUP_USER_TEMPLATE: &str = r#"## CV (estratto)
{cv_summary}

## RUOLO: {role} @ {company}
## GIORNI DALLA CANDIDATURA: {days_since_application}
## LINGUA: {language}

Scrivi email follow-up."#;

/// System prompt for LinkedIn outreach messages.
pub const LINKEDIN_SYSTEM: &str = r#"Scrivi messaggi LinkedIn per contattare recruiter/hiring manager. Rispondi SOLO con JSON valido:
{"message": "max 300 char, diretto e personale", "connection_note": "max 200 char per richiesta connessione", "approach_tip": "consiglio su come/quando inviare"}

Regole: specifico sul ruolo, mostra studio dell'azienda, non allegare CV subito, scrivi nella lingua richiesta.
JSON: no trailing comma, doppi apici, \n per newline."#;

/// User prompt template for LinkedIn outreach. Replace `{cv_summary}`, `{role}`,
/// `{company}`, `{contact_info}`, `{language}`.
pub const LINKEDIN_USER_TEMPLATE: &str = r#"## CV (estratto)
{cv_summary}

## RUOLO: {role} @ {company}
## CONTATTO: {contact_info}
## LINGUA: {language}

Scrivi messaggio LinkedIn e connection note."#;

/// System instruction for the one-shot self-repair escalation: syntax fixes
/// only, never content changes.
pub const JSON_FIX_SYSTEM: &str = "You fix malformed JSON. Respond ONLY with the corrected JSON object, \
    no text before or after, no markdown code blocks. \
    Don't change content, only fix JSON syntax errors.";

/// User prompt template for self-repair. Replace `{broken_json}`.
pub const JSON_FIX_USER_TEMPLATE: &str = "Fix this malformed JSON:\n\n{broken_json}";
